//! Deployment orchestrator
//!
//! Sequences one deployment: validate, resolve target, backup, trigger,
//! monitor, health check and, on failure, rollback. Every outcome is
//! folded into a single [`DeploymentResult`]; nothing is propagated.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backup::{BackupHandle, BackupProvider};
use crate::deploy::driver::BackendDriver;
use crate::deploy::monitor::{self, MonitorState};
use crate::errors::DeployError;
use crate::execlog::{ExecutionEvent, ExecutionLog, StepPhase};
use crate::health::probe::{HealthCheckResult, HealthProbe};
use crate::models::deployment::{
    Backend, BackendStatus, DeploymentRequest, DeploymentResult, RollbackOutcome,
};
use crate::storage::settings::DeploymentSettings;

/// Timeout of the post-deployment health check
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Shutdown signal raced against the trigger, the monitoring loop and
/// the rollback
pub type Shutdown = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A shutdown signal that never fires
pub fn never() -> Shutdown {
    Box::pin(std::future::pending())
}

const STEP_RESOLVE: &str = "Resolving deployment target";
const STEP_BACKUP: &str = "Creating pre-deployment backup";
const STEP_TRIGGER: &str = "Triggering deployment";
const STEP_MONITOR: &str = "Monitoring deployment";
const STEP_HEALTH: &str = "Running health checks";
const STEP_ROLLBACK: &str = "Attempting rollback";

/// Drives a deployment through one backend driver
pub struct Orchestrator {
    settings: DeploymentSettings,
    driver: Arc<dyn BackendDriver>,
    probe: HealthProbe,
    log: Arc<dyn ExecutionLog>,
    backup: Option<Arc<dyn BackupProvider>>,
    health_url: Option<String>,
    health_timeout: Duration,
}

/// Partial results collected while a deployment runs
#[derive(Default)]
struct Progress {
    deployment_id: Option<String>,
    backend_status: Option<BackendStatus>,
    backup: Option<BackupHandle>,
    health: Option<HealthCheckResult>,
    rollback: Option<RollbackOutcome>,
}

impl Orchestrator {
    /// `settings` is a snapshot; later configuration edits do not reach
    /// this orchestrator
    pub fn new(
        settings: DeploymentSettings,
        driver: Arc<dyn BackendDriver>,
        probe: HealthProbe,
        log: Arc<dyn ExecutionLog>,
    ) -> Self {
        Self {
            settings,
            driver,
            probe,
            log,
            backup: None,
            health_url: None,
            health_timeout: HEALTH_CHECK_TIMEOUT,
        }
    }

    pub fn with_backup(mut self, backup: Arc<dyn BackupProvider>) -> Self {
        self.backup = Some(backup);
        self
    }

    /// URL checked after a successful deployment; `None` skips the check
    pub fn with_health_check(mut self, url: Option<String>, timeout: Duration) -> Self {
        self.health_url = url.filter(|u| !u.trim().is_empty());
        self.health_timeout = timeout;
        self
    }

    /// Run a deployment to completion and return its result.
    ///
    /// When `shutdown` fires during the trigger or the monitoring loop the
    /// deployment ends as `Cancelled` and no rollback runs. A rollback
    /// already in progress is abandoned and reported as failed.
    pub async fn deploy(&self, request: DeploymentRequest, shutdown: Shutdown) -> DeploymentResult {
        let run_id = Uuid::new_v4();
        let span = info_span!("deployment", %run_id, backend = %request.backend);
        self.deploy_inner(run_id, request, shutdown).instrument(span).await
    }

    async fn deploy_inner(
        &self,
        run_id: Uuid,
        request: DeploymentRequest,
        shutdown: Shutdown,
    ) -> DeploymentResult {
        let started = Instant::now();
        self.log.record(ExecutionEvent::DeploymentStarted {
            backend: request.backend,
            environment: request.environment,
            details: describe(&request),
        });

        let mut progress = Progress::default();
        let outcome = self.run(&request, shutdown, &mut progress).await;
        let elapsed = started.elapsed();

        let (success, message, error) = match outcome {
            Ok(summary) => (true, summary, None),
            Err(e) => {
                self.log.record(ExecutionEvent::error(
                    &format!("{} deployment", request.backend.display_name()),
                    e.to_string(),
                ));
                (false, e.to_string(), Some(e))
            }
        };
        self.log.record(ExecutionEvent::finished(success, elapsed));

        DeploymentResult {
            run_id,
            success,
            backend: request.backend,
            environment: request.environment,
            deployment_id: progress.deployment_id,
            backend_status: progress.backend_status.unwrap_or(BackendStatus::Unknown),
            message,
            error,
            backup: progress.backup,
            health: progress.health,
            rollback: progress.rollback,
            duration_secs: elapsed.as_secs_f64(),
        }
    }

    async fn run(
        &self,
        request: &DeploymentRequest,
        mut shutdown: Shutdown,
        progress: &mut Progress,
    ) -> Result<String, DeployError> {
        if request.backend != self.driver.backend() {
            return Err(DeployError::Configuration(format!(
                "{} request sent to the {} driver",
                request.backend,
                self.driver.backend()
            )));
        }
        self.driver.validate(request)?;

        self.begin(STEP_RESOLVE);
        let target = self.end(STEP_RESOLVE, self.driver.resolve_target(request).await)?;
        debug!("Deployment target: {}", target);

        if self.settings.backup_before_deploy {
            progress.backup = self.create_backup().await;
        }

        self.begin(STEP_TRIGGER);
        let triggered = tokio::select! {
            biased;
            _ = &mut shutdown => {
                self.log.record(ExecutionEvent::step(STEP_TRIGGER, StepPhase::Failed));
                return Err(DeployError::Cancelled);
            }
            result = self.driver.trigger(request, &target) => result,
        };
        let triggered = match self.end(STEP_TRIGGER, triggered) {
            Ok(triggered) => triggered,
            Err(e @ DeployError::Timeout(_)) => {
                self.rollback(&target, None, &mut shutdown, progress).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        progress.deployment_id = Some(triggered.deployment_id.clone());
        info!("Deployment {} triggered", triggered.deployment_id);

        self.begin(STEP_MONITOR);
        let report = monitor::watch(
            self.driver.as_ref(),
            &triggered.deployment_id,
            &self.settings,
            &mut shutdown,
        )
        .await;
        progress.backend_status = Some(report.last_status);

        let failure = match report.state {
            MonitorState::Success => None,
            MonitorState::Failed => Some(DeployError::Status(format!(
                "Deployment {} reported status {}",
                triggered.deployment_id, report.last_status
            ))),
            MonitorState::TimedOut => Some(DeployError::Timeout(format!(
                "Deployment monitoring timeout after {} seconds",
                self.settings.monitor_timeout_secs
            ))),
            MonitorState::Cancelled => {
                self.log.record(ExecutionEvent::step(STEP_MONITOR, StepPhase::Failed));
                return Err(DeployError::Cancelled);
            }
            MonitorState::Pending | MonitorState::Running => Some(DeployError::Status(format!(
                "Monitoring of {} ended without a finished status",
                triggered.deployment_id
            ))),
        };
        let phase = if failure.is_none() {
            StepPhase::End
        } else {
            StepPhase::Failed
        };
        self.log.record(ExecutionEvent::step(STEP_MONITOR, phase));

        let failure = match failure {
            Some(e) => Some(e),
            None => self.verify_health(progress).await.err(),
        };

        if let Some(e) = failure {
            self.rollback(
                &triggered.target,
                Some(&triggered.deployment_id),
                &mut shutdown,
                progress,
            )
            .await;
            return Err(e);
        }

        Ok(triggered.summary)
    }

    async fn create_backup(&self) -> Option<BackupHandle> {
        let backup = self.backup.as_ref()?;

        self.begin(STEP_BACKUP);
        match backup.create_backup("pre-deployment").await {
            Ok(handle) => {
                self.log.record(ExecutionEvent::Backup {
                    operation: "create".to_string(),
                    path: handle.path.display().to_string(),
                    success: true,
                });
                self.log.record(ExecutionEvent::step(STEP_BACKUP, StepPhase::End));
                Some(handle)
            }
            Err(e) => {
                self.log.record(ExecutionEvent::Backup {
                    operation: "create".to_string(),
                    path: String::new(),
                    success: false,
                });
                self.log.record(ExecutionEvent::error("Backup creation", e.to_string()));
                self.log.record(ExecutionEvent::step(STEP_BACKUP, StepPhase::Failed));
                None
            }
        }
    }

    async fn verify_health(&self, progress: &mut Progress) -> Result<(), DeployError> {
        let Some(url) = &self.health_url else {
            info!("No health check URL configured, skipping health checks");
            return Ok(());
        };

        self.begin(STEP_HEALTH);
        let result = self.probe.check(url, self.health_timeout).await;
        self.log.record(ExecutionEvent::HealthCheck {
            url: result.url.clone(),
            status_code: result.status_code,
            response_time_secs: result.response_time_secs,
            passed: result.passed,
        });

        let outcome = if result.passed {
            Ok(())
        } else {
            Err(DeployError::HealthCheck(result.message()))
        };
        progress.health = Some(result);
        self.end(STEP_HEALTH, outcome)
    }

    /// At most one rollback per deployment, and only when enabled
    async fn rollback(
        &self,
        target: &str,
        deployment_id: Option<&str>,
        shutdown: &mut Shutdown,
        progress: &mut Progress,
    ) {
        if !self.settings.rollback_on_failure {
            info!("Rollback on failure is disabled");
            return;
        }
        if progress.rollback.is_some() {
            return;
        }

        self.begin(STEP_ROLLBACK);
        let outcome = tokio::select! {
            biased;
            _ = shutdown => {
                warn!("Shutdown requested, abandoning rollback of {}", target);
                RollbackOutcome::Failed("Rollback interrupted by shutdown".to_string())
            }
            outcome = self.driver.rollback(target, deployment_id) => outcome,
        };
        self.log.record(ExecutionEvent::Rollback {
            outcome: outcome.clone(),
        });
        let phase = match outcome {
            RollbackOutcome::Completed(_) => StepPhase::End,
            _ => StepPhase::Failed,
        };
        self.log.record(ExecutionEvent::step(STEP_ROLLBACK, phase));
        progress.rollback = Some(outcome);
    }

    fn begin(&self, step: &str) {
        self.log.record(ExecutionEvent::step(step, StepPhase::Start));
    }

    fn end<T>(&self, step: &str, result: Result<T, DeployError>) -> Result<T, DeployError> {
        let phase = if result.is_ok() {
            StepPhase::End
        } else {
            StepPhase::Failed
        };
        self.log.record(ExecutionEvent::step(step, phase));
        result
    }
}

/// Key/value details logged when a deployment starts
fn describe(request: &DeploymentRequest) -> Vec<(String, String)> {
    let mut details = Vec::new();
    if !request.project_or_provider.is_empty() {
        let key = match request.backend {
            Backend::Vps => "provider",
            _ => "project",
        };
        details.push((key.to_string(), request.project_or_provider.clone()));
    }
    if request.force {
        details.push(("force".to_string(), "true".to_string()));
    }
    details.extend(
        request
            .options
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    details
}
