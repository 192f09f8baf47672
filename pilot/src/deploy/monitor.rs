//! Monitoring loop for triggered deployments

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::deploy::driver::BackendDriver;
use crate::deploy::orchestrator::Shutdown;
use crate::models::deployment::BackendStatus;
use crate::storage::settings::DeploymentSettings;

/// Shortest pause between two polls
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Monitoring state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// No status seen yet, or the backend reports pending/unknown
    Pending,

    /// The backend reported the deployment as running
    Running,

    /// Finished successfully
    Success,

    /// Finished with a failure
    Failed,

    /// The monitoring budget ran out
    TimedOut,

    /// Monitoring was aborted by shutdown
    Cancelled,
}

impl MonitorState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MonitorState::Pending | MonitorState::Running)
    }
}

/// Monitoring event
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A status poll returned
    Observed(BackendStatus),

    /// Elapsed time reached the monitoring timeout
    Timeout,

    /// Shutdown was requested
    Cancel,
}

/// Monitoring FSM
#[derive(Debug, Clone)]
pub struct MonitorFsm {
    state: MonitorState,
    last_status: BackendStatus,
}

impl MonitorFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: MonitorState::Pending,
            last_status: BackendStatus::Unknown,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Last status reported by the backend
    pub fn last_status(&self) -> BackendStatus {
        self.last_status
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: MonitorEvent) -> Result<(), String> {
        if self.state.is_terminal() {
            return Err(format!(
                "Invalid transition: {:?} -> {:?}",
                self.state, event
            ));
        }

        self.state = match event {
            MonitorEvent::Observed(status) => {
                self.last_status = status;
                match status {
                    BackendStatus::Success => MonitorState::Success,
                    BackendStatus::Failed => MonitorState::Failed,
                    BackendStatus::Running => MonitorState::Running,
                    // Running is sticky until a terminal status arrives
                    BackendStatus::Pending | BackendStatus::Unknown => self.state,
                }
            }
            MonitorEvent::Timeout => MonitorState::TimedOut,
            MonitorEvent::Cancel => MonitorState::Cancelled,
        };
        Ok(())
    }
}

impl Default for MonitorFsm {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a finished monitoring loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    pub state: MonitorState,
    pub last_status: BackendStatus,
    pub polls: u32,
    /// Polls that failed and were treated as not finished
    pub poll_errors: u32,
    pub last_error: Option<String>,
    pub elapsed: Duration,
}

/// Poll `deployment_id` until the backend reports a finished status, the
/// monitoring timeout elapses or `shutdown` resolves.
///
/// Polls run at a fixed cadence of `health_check_interval` starting at
/// t=0, and one last poll is made once the timeout has been reached.
/// Failed polls count as "not finished yet".
pub async fn watch(
    driver: &dyn BackendDriver,
    deployment_id: &str,
    settings: &DeploymentSettings,
    shutdown: &mut Shutdown,
) -> MonitorReport {
    let started = Instant::now();
    let timeout = settings.monitor_timeout();
    let interval = settings.poll_interval().max(MIN_POLL_INTERVAL);

    let mut fsm = MonitorFsm::new();
    let mut polls = 0;
    let mut poll_errors = 0;
    let mut last_error = None;

    loop {
        let polled = tokio::select! {
            biased;
            _ = &mut *shutdown => None,
            result = driver.poll_status(deployment_id) => Some(result),
        };

        let event = match polled {
            None => MonitorEvent::Cancel,
            Some(Ok(status)) => {
                polls += 1;
                debug!("Deployment {} status: {}", deployment_id, status);
                MonitorEvent::Observed(status)
            }
            Some(Err(e)) => {
                polls += 1;
                poll_errors += 1;
                warn!("Status poll for {} failed: {}", deployment_id, e);
                last_error = Some(e.to_string());
                MonitorEvent::Observed(BackendStatus::Unknown)
            }
        };
        let _ = fsm.process(event);
        if fsm.state().is_terminal() {
            break;
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            let _ = fsm.process(MonitorEvent::Timeout);
            break;
        }

        let pause = interval.min(timeout - elapsed);
        let cancelled = tokio::select! {
            biased;
            _ = &mut *shutdown => true,
            _ = tokio::time::sleep(pause) => false,
        };
        if cancelled {
            let _ = fsm.process(MonitorEvent::Cancel);
            break;
        }
    }

    let report = MonitorReport {
        state: fsm.state(),
        last_status: fsm.last_status(),
        polls,
        poll_errors,
        last_error,
        elapsed: started.elapsed(),
    };
    info!(
        "Monitoring of {} ended in {:?} after {} polls",
        deployment_id, report.state, report.polls
    );
    report
}
