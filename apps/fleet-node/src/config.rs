use std::path::PathBuf;

/// Process-wide configuration, loaded once at startup from environment
/// variables. `dotenvy::dotenv()` is applied before this reads anything.
#[derive(Debug, Clone)]
pub struct Config {
    pub node_id: String,
    pub node_name: String,
    pub is_primary: bool,
    pub api_endpoint: String,
    pub node_api_key: String,
    /// Base URL of the primary, required on secondaries to pull settings.
    pub primary_url: Option<String>,

    pub apps_root: PathBuf,
    pub database_url: String,
    pub database_auth_token: Option<String>,

    /// Bearer token the user-facing HTTP API expects on `/api/*` routes.
    pub api_token: String,
    pub port: u16,
    pub max_description_len: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            node_id: env_or("NODE_ID", || fleet_domain_models::new_id()),
            node_name: env_or("NODE_NAME", || "primary".to_string()),
            is_primary: env_bool("NODE_IS_PRIMARY", true),
            api_endpoint: env_or("NODE_API_ENDPOINT", || "http://localhost:3000".to_string()),
            node_api_key: env_or("NODE_API_KEY", || fleet_domain_models::new_id()),
            primary_url: std::env::var("PRIMARY_URL").ok(),

            apps_root: PathBuf::from(env_or("APPS_ROOT", || "./apps-data".to_string())),
            database_url: std::env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            database_auth_token: std::env::var("DATABASE_AUTH_TOKEN").ok(),

            api_token: env_or("API_TOKEN", || "dev-token".to_string()),
            port: env_or("PORT", || "3000".to_string())
                .parse()
                .unwrap_or(3000),
            max_description_len: env_or("MAX_DESCRIPTION_LEN", || "2048".to_string())
                .parse()
                .unwrap_or(2048),
        }
    }
}

fn env_or(key: &str, default: impl FnOnce() -> String) -> String {
    std::env::var(key).unwrap_or_else(|_| default())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
