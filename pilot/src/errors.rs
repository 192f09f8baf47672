//! Error types for deploy-pilot

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Plumbing error type shared by the configuration, file, HTTP and
/// process layers
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP status error: {status} - {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Process error: {0}")]
    ProcessError(String),

    #[error("Backup error: {0}")]
    BackupError(String),

    #[error("Logging error: {0}")]
    LoggingError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Category of a deployment failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployErrorKind {
    Configuration,
    Trigger,
    Timeout,
    Status,
    HealthCheck,
    Cancelled,
    Unsupported,
}

/// Deployment failure carried inside a `DeploymentResult`
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DeployError {
    /// Required settings are missing; nothing was attempted
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The backend rejected or failed to start the deployment
    #[error("Trigger failed: {0}")]
    Trigger(String),

    /// A subprocess or the monitoring loop exceeded its budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Status polling failed or the backend reported a failed deployment
    #[error("Deployment failed: {0}")]
    Status(String),

    #[error("Health check failed: {0}")]
    HealthCheck(String),

    #[error("Deployment cancelled")]
    Cancelled,

    /// The backend has no implementation for the requested operation
    #[error("Not supported: {0}")]
    Unsupported(String),
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Configuration(_) => DeployErrorKind::Configuration,
            DeployError::Trigger(_) => DeployErrorKind::Trigger,
            DeployError::Timeout(_) => DeployErrorKind::Timeout,
            DeployError::Status(_) => DeployErrorKind::Status,
            DeployError::HealthCheck(_) => DeployErrorKind::HealthCheck,
            DeployError::Cancelled => DeployErrorKind::Cancelled,
            DeployError::Unsupported(_) => DeployErrorKind::Unsupported,
        }
    }
}

impl From<AppError> for DeployError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::ConfigError(msg) => DeployError::Configuration(msg),
            other => DeployError::Trigger(other.to_string()),
        }
    }
}
