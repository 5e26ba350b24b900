//! libSQL-backed persistence: connection management, schema, and one
//! repository per table.

mod client;
mod errors;
mod repositories;
mod schema;

pub use client::Store;
pub use errors::db_err;
pub use repositories::{
    AppRepository, ComposeVersionRepository, NodeRepository, SettingsRepository, TunnelRepository,
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fleet_domain_models::{new_id, App, AppStatus, ComposeVersion, Node, NodeStatus};

    async fn test_store() -> Store {
        Store::connect(":memory:", None).await.unwrap()
    }

    fn sample_node() -> Node {
        Node {
            id: new_id(),
            name: "primary".to_string(),
            api_endpoint: "http://127.0.0.1:9000".to_string(),
            api_key: "secret".to_string(),
            is_primary: true,
            status: NodeStatus::Online,
            last_seen: None,
            last_health_check: None,
            consecutive_failures: 0,
        }
    }

    fn sample_app(node_id: &str) -> App {
        let now = Utc::now();
        App {
            id: new_id(),
            name: "uptime".to_string(),
            node_id: node_id.to_string(),
            description: String::new(),
            compose_content: "services:\n  web:\n    image: nginx\n".to_string(),
            tunnel_id: None,
            tunnel_token: None,
            tunnel_domain: None,
            public_url: None,
            status: AppStatus::Stopped,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn inserts_and_fetches_an_app() {
        let store = test_store().await;
        let conn = store.conn().unwrap();
        let node = sample_node();
        NodeRepository::insert(&conn, &node).await.unwrap();

        let app = sample_app(&node.id);
        AppRepository::insert(&conn, &app).await.unwrap();

        let fetched = AppRepository::get(&conn, &app.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "uptime");
        assert_eq!(fetched.status, AppStatus::Stopped);
    }

    #[tokio::test]
    async fn compose_version_append_keeps_one_current_row() {
        let store = test_store().await;
        let conn = store.conn().unwrap();
        let node = sample_node();
        NodeRepository::insert(&conn, &node).await.unwrap();
        let app = sample_app(&node.id);
        AppRepository::insert(&conn, &app).await.unwrap();

        let v1 = ComposeVersion {
            app_id: app.id.clone(),
            version: 1,
            compose_content: app.compose_content.clone(),
            is_current: true,
            change_reason: Some("initial".to_string()),
            changed_by: None,
            rolled_back_from: None,
            created_at: Utc::now(),
        };
        ComposeVersionRepository::append(&conn, &v1).await.unwrap();

        let v2 = ComposeVersion {
            version: 2,
            compose_content: "services:\n  web:\n    image: nginx:1.27\n".to_string(),
            change_reason: Some("bump image".to_string()),
            ..v1.clone()
        };
        ComposeVersionRepository::append(&conn, &v2).await.unwrap();

        let versions = ComposeVersionRepository::list(&conn, &app.id).await.unwrap();
        assert_eq!(versions.len(), 2);
        let current = ComposeVersionRepository::get_current(&conn, &app.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.version, 2);
    }

    #[tokio::test]
    async fn node_heartbeat_resets_failures_on_success() {
        let store = test_store().await;
        let conn = store.conn().unwrap();
        let node = sample_node();
        NodeRepository::insert(&conn, &node).await.unwrap();

        NodeRepository::record_heartbeat(&conn, &node.id, false, NodeStatus::Unreachable)
            .await
            .unwrap();
        NodeRepository::record_heartbeat(&conn, &node.id, false, NodeStatus::Unreachable)
            .await
            .unwrap();
        let after_failures = NodeRepository::get(&conn, &node.id).await.unwrap().unwrap();
        assert_eq!(after_failures.consecutive_failures, 2);

        NodeRepository::record_heartbeat(&conn, &node.id, true, NodeStatus::Online)
            .await
            .unwrap();
        let after_success = NodeRepository::get(&conn, &node.id).await.unwrap().unwrap();
        assert_eq!(after_success.consecutive_failures, 0);
        assert_eq!(after_success.status, NodeStatus::Online);
    }
}
