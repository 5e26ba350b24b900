use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingress::IngressRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    Stopped,
    Running,
    Updating,
    Error,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppStatus::Stopped => "stopped",
            AppStatus::Running => "running",
            AppStatus::Updating => "updating",
            AppStatus::Error => "error",
        }
    }
}

impl std::str::FromStr for AppStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopped" => Ok(AppStatus::Stopped),
            "running" => Ok(AppStatus::Running),
            "updating" => Ok(AppStatus::Updating),
            "error" => Ok(AppStatus::Error),
            other => Err(format!("unknown app status: {other}")),
        }
    }
}

/// A managed collection of containers defined by one compose document and
/// owned by exactly one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    pub name: String,
    pub node_id: String,
    pub description: String,
    pub compose_content: String,
    pub tunnel_id: Option<String>,
    pub tunnel_token: Option<String>,
    pub tunnel_domain: Option<String>,
    pub public_url: Option<String>,
    pub status: AppStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppRequest {
    pub name: String,
    pub description: String,
    pub compose_content: String,
    #[serde(default)]
    pub ingress_rules: Vec<IngressRule>,
    pub target_node: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub compose_content: Option<String>,
}
