//! Wire models for the PaaS deployment API
//!
//! The API identifies projects and deployments either by string or by
//! integer depending on the server version, so ids are read through
//! [`ResourceId`] and always handed to callers as strings.

use serde::{Deserialize, Serialize};

/// Project or deployment identifier as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Text(String),
    Number(i64),
}

impl ResourceId {
    pub fn into_string(self) -> String {
        match self {
            ResourceId::Text(s) => s,
            ResourceId::Number(n) => n.to_string(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceId::Text(s) => f.write_str(s),
            ResourceId::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A project as listed by `GET /api/projects`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ResourceId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Response of `GET /api/projects`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectList {
    #[serde(default)]
    pub data: Vec<Project>,
}

/// Body of `POST /api/projects`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: String,
}

/// Response of `POST /api/projects`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectResponse {
    pub id: ResourceId,
}

/// Body of `POST /api/projects/{id}/deploy`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerDeployRequest {
    pub environment: String,
    #[serde(default)]
    pub force: bool,
}

/// Response of `POST /api/projects/{id}/deploy`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerDeployResponse {
    #[serde(default)]
    pub deployment_id: Option<ResourceId>,
}

/// Response of `GET /api/deployments/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentStatusResponse {
    #[serde(default = "unknown_status")]
    pub status: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

fn unknown_status() -> String {
    "unknown".to_string()
}
