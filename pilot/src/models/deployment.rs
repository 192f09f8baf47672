//! Deployment models

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backup::BackupHandle;
use crate::errors::DeployError;
use crate::health::probe::HealthCheckResult;

/// Deployment backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// HTTP-API driven platform (Coolify)
    Paas,
    /// Docker Compose on the local host
    Compose,
    /// Provider deployment scripts against a VPS
    Vps,
}

impl Backend {
    pub fn display_name(&self) -> &'static str {
        match self {
            Backend::Paas => "PaaS",
            Backend::Compose => "Docker Compose",
            Backend::Vps => "VPS",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Backend::Paas => "paas",
            Backend::Compose => "compose",
            Backend::Vps => "vps",
        };
        f.write_str(s)
    }
}

/// Target environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[value(alias = "dev")]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

/// Status reported by a backend for a triggered deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Pending,
    Running,
    Success,
    Failed,
    Unknown,
}

impl BackendStatus {
    /// Whether the backend has reached a terminal status
    pub fn is_finished(&self) -> bool {
        matches!(self, BackendStatus::Success | BackendStatus::Failed)
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendStatus::Pending => "pending",
            BackendStatus::Running => "running",
            BackendStatus::Success => "success",
            BackendStatus::Failed => "failed",
            BackendStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A deployment request. Not modified once handed to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub backend: Backend,
    pub environment: Environment,
    #[serde(default)]
    pub force: bool,
    /// PaaS project name or VPS provider; empty for compose
    pub project_or_provider: String,
    /// Backend specific options (`compose_file`, `build`, `server_ip`, ...)
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl DeploymentRequest {
    pub fn new(backend: Backend, environment: Environment, project_or_provider: impl Into<String>) -> Self {
        Self {
            backend,
            environment,
            force: false,
            project_or_provider: project_or_provider.into(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_option(mut self, key: &str, value: impl Into<String>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Boolean option; `true`, `1` and `yes` count as set
    pub fn flag(&self, key: &str) -> bool {
        matches!(
            self.option(key).map(|v| v.to_lowercase()).as_deref(),
            Some("true") | Some("1") | Some("yes")
        )
    }
}

/// What happened to the rollback of a failed deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum RollbackOutcome {
    Completed(String),
    Failed(String),
    Unsupported(String),
}

/// The single result of a deployment request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentResult {
    /// Identifies the orchestration run in logs
    pub run_id: Uuid,
    pub success: bool,
    pub backend: Backend,
    pub environment: Environment,
    pub deployment_id: Option<String>,
    pub backend_status: BackendStatus,
    pub message: String,
    pub error: Option<DeployError>,
    pub backup: Option<BackupHandle>,
    pub health: Option<HealthCheckResult>,
    pub rollback: Option<RollbackOutcome>,
    pub duration_secs: f64,
}
