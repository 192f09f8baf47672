//! Execution log
//!
//! Every orchestration step reports through an [`ExecutionLog`]. The log
//! is a side channel: nothing reads it back to make decisions.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::models::deployment::{Backend, Environment, RollbackOutcome};

/// Phase of a named step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepPhase {
    Start,
    End,
    Failed,
}

impl StepPhase {
    fn label(&self) -> &'static str {
        match self {
            StepPhase::Start => "START",
            StepPhase::End => "END",
            StepPhase::Failed => "FAILED",
        }
    }
}

/// An entry of the execution log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    DeploymentStarted {
        backend: Backend,
        environment: Environment,
        details: Vec<(String, String)>,
    },
    Step {
        name: String,
        phase: StepPhase,
    },
    Backup {
        operation: String,
        path: String,
        success: bool,
    },
    HealthCheck {
        url: String,
        status_code: Option<u16>,
        response_time_secs: f64,
        passed: bool,
    },
    Rollback {
        outcome: RollbackOutcome,
    },
    Error {
        context: String,
        message: String,
    },
    DeploymentFinished {
        success: bool,
        duration_secs: f64,
    },
}

impl ExecutionEvent {
    pub fn step(name: &str, phase: StepPhase) -> Self {
        ExecutionEvent::Step {
            name: name.to_string(),
            phase,
        }
    }

    pub fn error(context: &str, message: impl Into<String>) -> Self {
        ExecutionEvent::Error {
            context: context.to_string(),
            message: message.into(),
        }
    }

    pub fn finished(success: bool, duration: Duration) -> Self {
        ExecutionEvent::DeploymentFinished {
            success,
            duration_secs: duration.as_secs_f64(),
        }
    }
}

/// Append-only sink for execution events
pub trait ExecutionLog: Send + Sync {
    fn record(&self, event: ExecutionEvent);
}

/// Renders events through `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingLog;

impl ExecutionLog for TracingLog {
    fn record(&self, event: ExecutionEvent) {
        match event {
            ExecutionEvent::DeploymentStarted {
                backend,
                environment,
                details,
            } => {
                info!(
                    "=== Starting {} deployment to {} ===",
                    backend.display_name(),
                    environment
                );
                for (key, value) in details {
                    info!("{}: {}", key, value);
                }
            }
            ExecutionEvent::Step { name, phase } => match phase {
                StepPhase::Failed => warn!("[{}] {}", phase.label(), name),
                _ => info!("[{}] {}", phase.label(), name),
            },
            ExecutionEvent::Backup {
                operation,
                path,
                success,
            } => {
                if success {
                    info!("Backup {} successful: {}", operation, path);
                } else {
                    error!("Backup {} failed: {}", operation, path);
                }
            }
            ExecutionEvent::HealthCheck {
                url,
                status_code,
                response_time_secs,
                passed,
            } => {
                let status = status_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "no response".to_string());
                if passed {
                    info!(
                        "Health check PASSED for {} - Status: {} - Response time: {:.2}s",
                        url, status, response_time_secs
                    );
                } else {
                    error!(
                        "Health check FAILED for {} - Status: {} - Response time: {:.2}s",
                        url, status, response_time_secs
                    );
                }
            }
            ExecutionEvent::Rollback { outcome } => match outcome {
                RollbackOutcome::Completed(detail) => info!("Rollback completed: {}", detail),
                RollbackOutcome::Failed(detail) => error!("Rollback failed: {}", detail),
                RollbackOutcome::Unsupported(detail) => warn!("Rollback unavailable: {}", detail),
            },
            ExecutionEvent::Error { context, message } => {
                error!("Error in {}: {}", context, message);
            }
            ExecutionEvent::DeploymentFinished {
                success,
                duration_secs,
            } => {
                if success {
                    info!("=== Deployment completed successfully ===");
                } else {
                    error!("=== Deployment failed ===");
                }
                info!("Duration: {:.2} seconds", duration_secs);
            }
        }
    }
}

/// Keeps events in memory in the order they were recorded
#[derive(Debug, Default)]
pub struct RecordingLog {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ExecutionEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Names of the steps recorded with the given phase
    pub fn steps(&self, phase: StepPhase) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ExecutionEvent::Step { name, phase: p } if p == phase => Some(name),
                _ => None,
            })
            .collect()
    }
}

impl ExecutionLog for RecordingLog {
    fn record(&self, event: ExecutionEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
