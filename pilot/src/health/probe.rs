//! Single-request HTTP health probe

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;

/// Why a probe did not pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum HealthFailure {
    /// The endpoint answered with a non-2xx status
    Status(u16),
    /// No usable response: connection, DNS, TLS or timeout error
    Request(String),
}

/// Outcome of one probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub url: String,
    pub status_code: Option<u16>,
    pub response_time_secs: f64,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<HealthFailure>,
}

impl HealthCheckResult {
    /// Human readable summary
    pub fn message(&self) -> String {
        match (&self.failure, self.status_code) {
            (None, Some(code)) => format!(
                "Health check passed for {} (Status: {}, Response time: {:.2}s)",
                self.url, code, self.response_time_secs
            ),
            (Some(HealthFailure::Status(code)), _) => {
                format!("Health check failed for {} (Status: {})", self.url, code)
            }
            (Some(HealthFailure::Request(err)), _) => {
                format!("Health check error for {}: {}", self.url, err)
            }
            (None, None) => format!("Health check for {} returned no status", self.url),
        }
    }
}

/// HTTP GET probe; passes on any 2xx status
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: Client,
}

impl HealthProbe {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Probe `url` once, giving up after `timeout`
    pub async fn check(&self, url: &str, timeout: Duration) -> HealthCheckResult {
        debug!("Probing {} (timeout {:?})", url, timeout);
        let started = Instant::now();
        let response = self.client.get(url).timeout(timeout).send().await;
        let response_time_secs = started.elapsed().as_secs_f64();

        match response {
            Ok(response) => {
                let code = response.status().as_u16();
                let passed = response.status().is_success();
                HealthCheckResult {
                    url: url.to_string(),
                    status_code: Some(code),
                    response_time_secs,
                    passed,
                    failure: (!passed).then_some(HealthFailure::Status(code)),
                }
            }
            Err(e) => HealthCheckResult {
                url: url.to_string(),
                status_code: None,
                response_time_secs,
                passed: false,
                failure: Some(HealthFailure::Request(e.to_string())),
            },
        }
    }
}
