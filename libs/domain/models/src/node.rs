use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Online,
    Offline,
    Unreachable,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Online => "online",
            NodeStatus::Offline => "offline",
            NodeStatus::Unreachable => "unreachable",
        }
    }
}

impl std::str::FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(NodeStatus::Online),
            "offline" => Ok(NodeStatus::Offline),
            "unreachable" => Ok(NodeStatus::Unreachable),
            other => Err(format!("unknown node status: {other}")),
        }
    }
}

/// A registered cluster member. Exactly one node has `is_primary = true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub api_endpoint: String,
    pub api_key: String,
    pub is_primary: bool,
    pub status: NodeStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub last_health_check: Option<DateTime<Utc>>,
    pub consecutive_failures: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNodeRequest {
    pub name: String,
    pub api_endpoint: String,
    pub api_key: String,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNodeRequest {
    pub name: Option<String>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
}
