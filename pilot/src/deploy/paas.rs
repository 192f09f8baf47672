//! PaaS (Coolify) driver

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{debug, info};

use crate::deploy::driver::{BackendDriver, Triggered};
use crate::errors::{AppError, DeployError};
use crate::http::client::HttpClient;
use crate::http::paas::map_status;
use crate::models::deployment::{Backend, BackendStatus, DeploymentRequest, RollbackOutcome};
use crate::storage::settings::CoolifySettings;

/// Deploys through the PaaS HTTP API
#[derive(Debug, Clone)]
pub struct PaasDriver {
    client: Option<HttpClient>,
    default_project: String,
}

impl PaasDriver {
    /// Build the driver from settings. The driver is created even when
    /// the base URL or token is missing; `validate` reports it.
    pub fn from_settings(settings: &CoolifySettings) -> Result<Self, AppError> {
        let client = if settings.base_url.trim().is_empty() || settings.api_token.trim().is_empty() {
            None
        } else {
            Some(HttpClient::new(
                &settings.base_url,
                SecretString::from(settings.api_token.clone()),
            )?)
        };

        Ok(Self {
            client,
            default_project: settings.project_name.clone(),
        })
    }

    pub fn with_client(client: HttpClient, default_project: &str) -> Self {
        Self {
            client: Some(client),
            default_project: default_project.to_string(),
        }
    }

    fn require_client(&self) -> Result<&HttpClient, DeployError> {
        self.client.as_ref().ok_or_else(|| {
            DeployError::Configuration(
                "PaaS base URL and API token are required (coolify.base_url, coolify.api_token)"
                    .to_string(),
            )
        })
    }

    fn project_name<'a>(&'a self, request: &'a DeploymentRequest) -> &'a str {
        let requested = request.project_or_provider.trim();
        if requested.is_empty() {
            &self.default_project
        } else {
            requested
        }
    }
}

#[async_trait]
impl BackendDriver for PaasDriver {
    fn backend(&self) -> Backend {
        Backend::Paas
    }

    fn validate(&self, request: &DeploymentRequest) -> Result<(), DeployError> {
        self.require_client()?;
        if self.project_name(request).is_empty() {
            return Err(DeployError::Configuration(
                "No PaaS project name given (coolify.project_name)".to_string(),
            ));
        }
        Ok(())
    }

    async fn resolve_target(&self, request: &DeploymentRequest) -> Result<String, DeployError> {
        let client = self.require_client()?;
        let name = self.project_name(request);
        client
            .get_or_create_project(name)
            .await
            .map_err(|e| DeployError::Trigger(format!("Failed to get or create project {}: {}", name, e)))
    }

    async fn trigger(
        &self,
        request: &DeploymentRequest,
        target: &str,
    ) -> Result<Triggered, DeployError> {
        let client = self.require_client()?;
        let environment = request.environment.as_str();

        let deployment_id = client
            .trigger_deployment(target, environment, request.force)
            .await
            .map_err(|e| DeployError::Trigger(format!("PaaS deployment request failed: {}", e)))?;
        info!("PaaS deployment {} started for project {}", deployment_id, target);

        Ok(Triggered {
            deployment_id,
            target: target.to_string(),
            summary: format!(
                "Successfully deployed to PaaS (Project: {}, Environment: {})",
                target, environment
            ),
        })
    }

    async fn poll_status(&self, deployment_id: &str) -> Result<BackendStatus, DeployError> {
        let client = self.require_client()?;
        let response = client
            .deployment_status(deployment_id)
            .await
            .map_err(|e| DeployError::Status(e.to_string()))?;
        debug!("PaaS deployment {} reported '{}'", deployment_id, response.status);
        Ok(map_status(&response.status))
    }

    async fn rollback(&self, target: &str, deployment_id: Option<&str>) -> RollbackOutcome {
        RollbackOutcome::Unsupported(format!(
            "PaaS rollback is not implemented (project {}, deployment {})",
            target,
            deployment_id.unwrap_or("none")
        ))
    }
}
