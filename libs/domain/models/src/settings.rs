use serde::{Deserialize, Serialize};

/// Process-wide configuration row. Exactly one exists; secondaries keep an
/// eventually-consistent local copy synced from the primary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub cloud_api_token: Option<String>,
    pub cloud_account_id: Option<String>,
    pub auto_start_apps: bool,
}

impl Settings {
    pub fn has_tunnel_credentials(&self) -> bool {
        self.cloud_api_token.is_some() && self.cloud_account_id.is_some()
    }
}
