//! Docker Compose driver

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::deploy::driver::{BackendDriver, Triggered};
use crate::errors::DeployError;
use crate::models::deployment::{Backend, BackendStatus, DeploymentRequest, RollbackOutcome};
use crate::process::{CommandOutput, CommandRunner, CommandSpec, ProcessError};
use crate::storage::settings::EnvironmentSettings;

/// Hard timeout of every compose invocation
pub const COMPOSE_TIMEOUT: Duration = Duration::from_secs(300);

/// Compose file used when nothing else is configured
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";

/// Runs `docker compose`, falling back to the standalone
/// `docker-compose` binary when `docker` is not installed
#[derive(Clone)]
pub struct ComposeCli {
    runner: Arc<dyn CommandRunner>,
    project_dir: PathBuf,
    timeout: Duration,
}

impl ComposeCli {
    pub fn new(runner: Arc<dyn CommandRunner>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            project_dir: project_dir.into(),
            timeout: COMPOSE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a compose command, with `-f <file>` when a file is given
    pub async fn run(&self, file: Option<&Path>, args: &[&str]) -> Result<CommandOutput, ProcessError> {
        let mut compose_args: Vec<String> = Vec::new();
        if let Some(file) = file {
            compose_args.push("-f".to_string());
            compose_args.push(file.display().to_string());
        }
        compose_args.extend(args.iter().map(|a| a.to_string()));

        let spec = CommandSpec::new("docker", self.timeout)
            .arg("compose")
            .args(compose_args.iter().cloned())
            .current_dir(&self.project_dir);
        debug!("Running: {}", spec.display());

        match self.runner.run(&spec).await {
            Err(e) if e.is_not_found() => {
                debug!("docker not found, trying docker-compose");
                let legacy = CommandSpec::new("docker-compose", self.timeout)
                    .args(compose_args)
                    .current_dir(&self.project_dir);
                self.runner.run(&legacy).await
            }
            other => other,
        }
    }
}

/// Deploys a compose file on the local Docker host
pub struct ComposeDriver {
    cli: ComposeCli,
    project_dir: PathBuf,
    environments: BTreeMap<String, EnvironmentSettings>,
    outcomes: RwLock<HashMap<String, BackendStatus>>,
}

impl ComposeDriver {
    pub fn new(
        cli: ComposeCli,
        project_dir: impl Into<PathBuf>,
        environments: BTreeMap<String, EnvironmentSettings>,
    ) -> Self {
        Self {
            cli,
            project_dir: project_dir.into(),
            environments,
            outcomes: RwLock::new(HashMap::new()),
        }
    }

    /// Compose file for a request: the `compose_file` option, else the
    /// environment's configured file, else `docker-compose.yml` when the
    /// configured file does not exist
    pub fn compose_file(&self, request: &DeploymentRequest) -> PathBuf {
        if let Some(explicit) = request.option("compose_file") {
            return self.resolve(explicit);
        }

        if let Some(env) = self.environments.get(request.environment.as_str()) {
            let configured = self.resolve(&env.docker_compose_file);
            if configured.exists() {
                return configured;
            }
            debug!(
                "Compose file {} not found, using {}",
                configured.display(),
                DEFAULT_COMPOSE_FILE
            );
        }
        self.resolve(DEFAULT_COMPOSE_FILE)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    async fn step(&self, file: &Path, args: &[&str]) -> Result<CommandOutput, DeployError> {
        let output = self.cli.run(Some(file), args).await.map_err(|e| match e {
            ProcessError::TimedOut { .. } => DeployError::Timeout(e.to_string()),
            ProcessError::Spawn { .. } => DeployError::Trigger(e.to_string()),
        })?;
        Ok(output)
    }
}

#[async_trait]
impl BackendDriver for ComposeDriver {
    fn backend(&self) -> Backend {
        Backend::Compose
    }

    fn validate(&self, request: &DeploymentRequest) -> Result<(), DeployError> {
        let file = self.compose_file(request);
        if !file.is_file() {
            return Err(DeployError::Configuration(format!(
                "Docker Compose file not found: {}",
                file.display()
            )));
        }
        Ok(())
    }

    async fn resolve_target(&self, request: &DeploymentRequest) -> Result<String, DeployError> {
        Ok(self.compose_file(request).display().to_string())
    }

    async fn trigger(
        &self,
        request: &DeploymentRequest,
        target: &str,
    ) -> Result<Triggered, DeployError> {
        let file = Path::new(target);

        if request.flag("restart") {
            info!("Stopping existing containers");
            let output = self.step(file, &["down"]).await?;
            if !output.success() {
                warn!("docker compose down failed: {}", output.error_text());
            }
        }

        if request.flag("build") {
            info!("Building Docker images");
            let output = self.step(file, &["build"]).await?;
            if !output.success() {
                return Err(DeployError::Trigger(format!(
                    "Docker build failed: {}",
                    output.error_text()
                )));
            }
        }

        info!("Starting Docker containers");
        let output = self.step(file, &["up", "-d"]).await?;
        if !output.success() {
            return Err(DeployError::Trigger(format!(
                "Docker deployment failed: {}",
                output.error_text()
            )));
        }

        let deployment_id = format!("compose-{}", Local::now().format("%Y%m%d%H%M%S%3f"));
        self.outcomes
            .write()
            .await
            .insert(deployment_id.clone(), BackendStatus::Success);

        Ok(Triggered {
            deployment_id,
            target: target.to_string(),
            summary: format!("Successfully deployed Docker containers from {}", target),
        })
    }

    async fn poll_status(&self, deployment_id: &str) -> Result<BackendStatus, DeployError> {
        self.outcomes
            .read()
            .await
            .get(deployment_id)
            .copied()
            .ok_or_else(|| DeployError::Status(format!("Unknown compose deployment: {}", deployment_id)))
    }

    async fn rollback(&self, target: &str, _deployment_id: Option<&str>) -> RollbackOutcome {
        match self.cli.run(Some(Path::new(target)), &["down"]).await {
            Ok(output) if output.success() => {
                RollbackOutcome::Completed(format!("Stopped containers from {}", target))
            }
            Ok(output) => RollbackOutcome::Failed(output.error_text()),
            Err(e) => RollbackOutcome::Failed(e.to_string()),
        }
    }
}
