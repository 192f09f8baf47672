//! Backend driver contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::DeployError;
use crate::models::deployment::{Backend, BackendStatus, DeploymentRequest, RollbackOutcome};

/// A deployment a driver has started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggered {
    pub deployment_id: String,
    /// Project id, compose file or provider the deployment targets
    pub target: String,
    /// Success message reported when the deployment completes
    pub summary: String,
}

/// Turns a deployment request into backend specific side effects.
///
/// A deployment started by one driver is only monitored and rolled back
/// through that same driver.
#[async_trait]
pub trait BackendDriver: Send + Sync {
    fn backend(&self) -> Backend;

    /// Check prerequisites without touching the network or spawning
    /// processes
    fn validate(&self, request: &DeploymentRequest) -> Result<(), DeployError>;

    /// Resolve the logical target of the deployment
    async fn resolve_target(&self, request: &DeploymentRequest) -> Result<String, DeployError> {
        Ok(request.project_or_provider.clone())
    }

    /// Start the deployment
    async fn trigger(
        &self,
        request: &DeploymentRequest,
        target: &str,
    ) -> Result<Triggered, DeployError>;

    /// Current status of a triggered deployment
    async fn poll_status(&self, deployment_id: &str) -> Result<BackendStatus, DeployError>;

    /// Best-effort reversal of a failed deployment. `deployment_id` is
    /// `None` when the trigger itself timed out.
    async fn rollback(&self, target: &str, deployment_id: Option<&str>) -> RollbackOutcome;
}
