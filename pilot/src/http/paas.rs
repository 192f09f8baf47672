//! PaaS deployment API

use paas_models::{
    CreateProjectRequest, CreateProjectResponse, DeploymentStatusResponse, ProjectList,
    TriggerDeployRequest, TriggerDeployResponse,
};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::http::client::HttpClient;
use crate::models::deployment::BackendStatus;

const PROJECT_DESCRIPTION: &str = "Auto-deployed by deploy-pilot";

impl HttpClient {
    /// List projects
    pub async fn list_projects(&self) -> Result<ProjectList, AppError> {
        self.get("/api/projects").await
    }

    /// Create a project and return its id
    pub async fn create_project(&self, name: &str) -> Result<String, AppError> {
        let body = CreateProjectRequest {
            name: name.to_string(),
            description: PROJECT_DESCRIPTION.to_string(),
        };
        let response: CreateProjectResponse = self.post("/api/projects", &body).await?;
        Ok(response.id.into_string())
    }

    /// Return the id of the project named `name`, creating it when no
    /// project has that name. A failed lookup falls through to creation.
    pub async fn get_or_create_project(&self, name: &str) -> Result<String, AppError> {
        match self.list_projects().await {
            Ok(list) => {
                if let Some(project) = list.data.into_iter().find(|p| p.name == name) {
                    debug!("Found existing project {} ({})", name, project.id);
                    return Ok(project.id.into_string());
                }
            }
            Err(e) => debug!("Project lookup failed, creating instead: {}", e),
        }

        let id = self.create_project(name).await?;
        info!("Created project {} ({})", name, id);
        Ok(id)
    }

    /// Start a deployment and return the deployment id
    pub async fn trigger_deployment(
        &self,
        project_id: &str,
        environment: &str,
        force: bool,
    ) -> Result<String, AppError> {
        let path = format!("/api/projects/{}/deploy", project_id);
        let body = TriggerDeployRequest {
            environment: environment.to_string(),
            force,
        };
        let response: TriggerDeployResponse = self.post(&path, &body).await?;
        response
            .deployment_id
            .map(|id| id.into_string())
            .ok_or_else(|| AppError::NotFound("deployment_id missing from response".to_string()))
    }

    /// Fetch the raw status of a deployment
    pub async fn deployment_status(
        &self,
        deployment_id: &str,
    ) -> Result<DeploymentStatusResponse, AppError> {
        let path = format!("/api/deployments/{}", deployment_id);
        self.get(&path).await
    }
}

/// Map a provider status string to the canonical status
pub fn map_status(raw: &str) -> BackendStatus {
    match raw.to_lowercase().as_str() {
        "success" | "finished" | "completed" => BackendStatus::Success,
        "failed" | "error" | "cancelled" | "canceled" => BackendStatus::Failed,
        "queued" | "pending" => BackendStatus::Pending,
        "running" | "in_progress" | "building" | "deploying" => BackendStatus::Running,
        _ => BackendStatus::Unknown,
    }
}
