use libsql::Connection;

use crate::errors::db_err;
use fleet_domain_models::FleetError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    api_endpoint TEXT NOT NULL,
    api_key TEXT NOT NULL,
    is_primary INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'offline',
    last_seen TEXT,
    last_health_check TEXT,
    consecutive_failures INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS apps (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    node_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    description TEXT,
    compose_content TEXT NOT NULL,
    tunnel_id TEXT,
    tunnel_token TEXT,
    tunnel_domain TEXT,
    public_url TEXT,
    status TEXT NOT NULL DEFAULT 'stopped',
    error_message TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(name, node_id)
);

CREATE INDEX IF NOT EXISTS idx_apps_node_id ON apps(node_id);

CREATE TABLE IF NOT EXISTS compose_versions (
    app_id TEXT NOT NULL REFERENCES apps(id) ON DELETE CASCADE,
    version INTEGER NOT NULL,
    compose_content TEXT NOT NULL,
    is_current INTEGER NOT NULL DEFAULT 0,
    change_reason TEXT,
    changed_by TEXT,
    rolled_back_from INTEGER,
    created_at TEXT NOT NULL,
    PRIMARY KEY (app_id, version)
);

CREATE INDEX IF NOT EXISTS idx_compose_versions_current
    ON compose_versions(app_id, is_current);

CREATE TABLE IF NOT EXISTS tunnels (
    app_id TEXT PRIMARY KEY REFERENCES apps(id) ON DELETE CASCADE,
    tunnel_id TEXT NOT NULL,
    tunnel_name TEXT NOT NULL,
    tunnel_token TEXT NOT NULL,
    account_id TEXT NOT NULL,
    ingress_rules TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL DEFAULT 'active',
    last_synced_at TEXT,
    error_details TEXT
);

CREATE TABLE IF NOT EXISTS settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    cloud_api_token TEXT,
    cloud_account_id TEXT,
    auto_start_apps INTEGER NOT NULL DEFAULT 0
);
"#;

/// Creates every table this workspace needs if it doesn't already exist.
/// Safe to run on every boot.
pub async fn apply_schema(conn: &Connection) -> Result<(), FleetError> {
    conn.execute_batch(SCHEMA).await.map_err(db_err)?;
    conn.execute(
        "INSERT OR IGNORE INTO settings (id, auto_start_apps) VALUES (1, 0)",
        (),
    )
    .await
    .map_err(db_err)?;
    Ok(())
}
