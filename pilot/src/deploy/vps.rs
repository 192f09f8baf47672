//! VPS script driver

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use tokio::sync::RwLock;
use tracing::info;

use crate::deploy::driver::{BackendDriver, Triggered};
use crate::errors::DeployError;
use crate::models::deployment::{Backend, BackendStatus, DeploymentRequest, RollbackOutcome};
use crate::process::{CommandRunner, CommandSpec, ProcessError};
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Hard timeout of a provider deployment script
pub const SCRIPT_TIMEOUT: Duration = Duration::from_secs(600);

/// Providers accepted on the command line
pub const PROVIDERS: [&str; 4] = ["vultr", "digitalocean", "aws", "custom"];

/// Runs `deploy-<provider>.sh` from the project directory
pub struct VpsDriver {
    runner: Arc<dyn CommandRunner>,
    layout: StorageLayout,
    configured: Vec<String>,
    timeout: Duration,
    outcomes: RwLock<HashMap<String, BackendStatus>>,
}

impl VpsDriver {
    pub fn new(runner: Arc<dyn CommandRunner>, layout: StorageLayout, settings: &Settings) -> Self {
        let configured = settings
            .vps_providers
            .keys()
            .filter(|name| settings.vps_provider(name).is_some())
            .cloned()
            .collect();

        Self {
            runner,
            layout,
            configured,
            timeout: SCRIPT_TIMEOUT,
            outcomes: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl BackendDriver for VpsDriver {
    fn backend(&self) -> Backend {
        Backend::Vps
    }

    fn validate(&self, request: &DeploymentRequest) -> Result<(), DeployError> {
        let provider = request.project_or_provider.as_str();
        if !self.configured.iter().any(|p| p == provider) {
            return Err(DeployError::Configuration(format!(
                "VPS configuration not found for provider: {}",
                provider
            )));
        }
        Ok(())
    }

    async fn trigger(
        &self,
        request: &DeploymentRequest,
        target: &str,
    ) -> Result<Triggered, DeployError> {
        let script = self.layout.vps_script(target);
        if !script.exists().await {
            return Err(DeployError::Unsupported(format!(
                "Custom VPS deployment for {} (server: {}) is not implemented",
                target,
                request.option("server_ip").unwrap_or("none")
            )));
        }
        info!("Using existing deployment script: {}", script.path().display());

        let mut spec = CommandSpec::new(script.path().display().to_string(), self.timeout)
            .current_dir(self.layout.project_dir())
            .args(["--environment", request.environment.as_str()]);
        if let Some(ip) = request.option("server_ip") {
            spec = spec.args(["--server-ip", ip]);
        }
        if let Some(key) = request.option("ssh_key") {
            spec = spec.args(["--ssh-key", key]);
        }

        let output = self.runner.run(&spec).await.map_err(|e| match e {
            ProcessError::TimedOut { .. } => DeployError::Timeout(e.to_string()),
            ProcessError::Spawn { .. } => {
                DeployError::Trigger(format!("Error running deployment script: {}", e))
            }
        })?;
        if !output.success() {
            return Err(DeployError::Trigger(format!(
                "Deployment script failed: {}",
                output.error_text()
            )));
        }

        let deployment_id = format!("vps-{}-{}", target, Local::now().format("%Y%m%d%H%M%S%3f"));
        self.outcomes
            .write()
            .await
            .insert(deployment_id.clone(), BackendStatus::Success);

        Ok(Triggered {
            deployment_id,
            target: target.to_string(),
            summary: format!(
                "Deployment script executed successfully: {}",
                output.stdout.trim_end()
            ),
        })
    }

    async fn poll_status(&self, deployment_id: &str) -> Result<BackendStatus, DeployError> {
        self.outcomes
            .read()
            .await
            .get(deployment_id)
            .copied()
            .ok_or_else(|| DeployError::Status(format!("Unknown VPS deployment: {}", deployment_id)))
    }

    async fn rollback(&self, target: &str, _deployment_id: Option<&str>) -> RollbackOutcome {
        RollbackOutcome::Unsupported(format!(
            "VPS rollback is not available for provider {}",
            target
        ))
    }
}
