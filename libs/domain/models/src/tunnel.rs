use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ingress::IngressRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunnelStatus {
    Active,
    Deleted,
    Error,
}

impl TunnelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelStatus::Active => "active",
            TunnelStatus::Deleted => "deleted",
            TunnelStatus::Error => "error",
        }
    }
}

impl std::str::FromStr for TunnelStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TunnelStatus::Active),
            "deleted" => Ok(TunnelStatus::Deleted),
            "error" => Ok(TunnelStatus::Error),
            other => Err(format!("unknown tunnel status: {other}")),
        }
    }
}

/// The local record of a cloud-provider reverse tunnel bound to one app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelRecord {
    pub app_id: String,
    pub tunnel_id: String,
    pub tunnel_name: String,
    pub tunnel_token: String,
    pub account_id: String,
    pub ingress_rules: Vec<IngressRule>,
    pub is_active: bool,
    pub status: TunnelStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub error_details: Option<String>,
}
