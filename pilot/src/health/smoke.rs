//! HTTP smoke tests for a deployed application

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::health::probe::HealthProbe;
use crate::utils::join_url;

/// Endpoints tried, in order, by the health test
pub const HEALTH_ENDPOINTS: [&str; 3] = ["api/health", "health", "status"];

/// Smoke test options
#[derive(Debug, Clone)]
pub struct SmokeOptions {
    pub health_check: bool,
    pub load_test: bool,
    pub load_duration: Duration,
    /// Pause between load test requests
    pub load_pause: Duration,
    pub request_timeout: Duration,
}

impl Default for SmokeOptions {
    fn default() -> Self {
        Self {
            health_check: true,
            load_test: false,
            load_duration: Duration::from_secs(10),
            load_pause: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// One smoke test outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeTest {
    pub name: String,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadStats>,
}

/// Load test counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadStats {
    pub requests: u32,
    pub errors: u32,
    pub duration_secs: f64,
    pub rps: f64,
    pub error_rate: f64,
}

impl LoadStats {
    /// Passing needs at least one request and under 10% errors
    pub fn passed(&self) -> bool {
        self.requests > 0 && self.error_rate < 0.1
    }
}

/// Full smoke test report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeReport {
    pub url: String,
    pub tests: Vec<SmokeTest>,
    pub overall_success: bool,
    pub timestamp: DateTime<Utc>,
}

/// Run the smoke tests against `url`. Health and load tests only run
/// when the connectivity test passes.
pub async fn run_smoke_tests(probe: &HealthProbe, url: &str, options: &SmokeOptions) -> SmokeReport {
    info!("Starting smoke tests for {}", url);
    let mut tests = Vec::new();

    let connectivity = connectivity_test(probe, url, options.request_timeout).await;
    let reachable = connectivity.success;
    tests.push(connectivity);

    if reachable {
        if options.health_check {
            tests.push(health_test(probe, url, options.request_timeout).await);
        }
        if options.load_test {
            tests.push(load_test(probe, url, options).await);
        }
    } else {
        warn!("{} is unreachable, skipping remaining smoke tests", url);
    }

    let overall_success = tests.iter().all(|t| t.success);
    SmokeReport {
        url: url.to_string(),
        tests,
        overall_success,
        timestamp: Utc::now(),
    }
}

async fn connectivity_test(probe: &HealthProbe, url: &str, timeout: Duration) -> SmokeTest {
    let result = probe.check(url, timeout).await;
    match result.status_code {
        Some(code) => SmokeTest {
            name: "connectivity".to_string(),
            success: code < 400,
            message: format!("HTTP {} in {:.2}s", code, result.response_time_secs),
            status_code: Some(code),
            response_time_secs: Some(result.response_time_secs),
            load: None,
        },
        None => SmokeTest {
            name: "connectivity".to_string(),
            success: false,
            message: result.message(),
            status_code: None,
            response_time_secs: None,
            load: None,
        },
    }
}

async fn health_test(probe: &HealthProbe, url: &str, timeout: Duration) -> SmokeTest {
    for endpoint in HEALTH_ENDPOINTS {
        let Some(candidate) = join_url(url, endpoint).map(|u| u.to_string()) else {
            continue;
        };
        let result = probe.check(&candidate, timeout).await;
        if result.passed {
            return SmokeTest {
                name: "health_check".to_string(),
                success: true,
                message: format!("Health endpoint found: {}", candidate),
                status_code: result.status_code,
                response_time_secs: Some(result.response_time_secs),
                load: None,
            };
        }
    }

    SmokeTest {
        name: "health_check".to_string(),
        success: false,
        message: format!("No health endpoint answered 2xx (tried {})", HEALTH_ENDPOINTS.join(", ")),
        status_code: None,
        response_time_secs: None,
        load: None,
    }
}

async fn load_test(probe: &HealthProbe, url: &str, options: &SmokeOptions) -> SmokeTest {
    let started = tokio::time::Instant::now();
    let mut requests = 0u32;
    let mut errors = 0u32;

    while started.elapsed() < options.load_duration {
        let result = probe.check(url, options.request_timeout).await;
        requests += 1;
        if !matches!(result.status_code, Some(code) if code < 400) {
            errors += 1;
        }
        tokio::time::sleep(options.load_pause).await;
    }

    let duration_secs = started.elapsed().as_secs_f64();
    let stats = LoadStats {
        requests,
        errors,
        duration_secs,
        rps: if duration_secs > 0.0 {
            requests as f64 / duration_secs
        } else {
            0.0
        },
        error_rate: if requests > 0 {
            errors as f64 / requests as f64
        } else {
            0.0
        },
    };

    SmokeTest {
        name: "load_test".to_string(),
        success: stats.passed(),
        message: format!(
            "Load test: {} requests in {:.2}s ({} errors)",
            requests, duration_secs, errors
        ),
        status_code: None,
        response_time_secs: None,
        load: Some(stats),
    }
}
