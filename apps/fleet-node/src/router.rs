use fleet_domain_models::{FleetError, Node};
use fleet_infra_store::NodeRepository;

use crate::state::AppState;

/// Where a per-node operation should execute.
pub enum RouteTarget {
    Local,
    Remote(Box<Node>),
}

/// `node_id == self.id` is local; an empty `node_id` is also treated as
/// local — the primary is authoritative for the record and the caller is
/// expected to already know the owning node from the app row.
pub fn is_local(state: &AppState, node_id: &str) -> bool {
    node_id.is_empty() || node_id == state.config.node_id
}

/// Resolves `node_id` to a dispatch target, looking up the `Node` row for a
/// remote id.
pub async fn resolve_target(state: &AppState, node_id: &str) -> Result<RouteTarget, FleetError> {
    if is_local(state, node_id) {
        return Ok(RouteTarget::Local);
    }
    let conn = state.store.conn()?;
    let node = NodeRepository::get(&conn, node_id)
        .await?
        .ok_or_else(|| FleetError::NotFound(format!("node {node_id}")))?;
    Ok(RouteTarget::Remote(Box::new(node)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_domain_models::{new_id, NodeStatus};
    use fleet_infra_store::Store;

    async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(":memory:", None).await.unwrap();
        let state = AppState::new(
            crate::config::Config {
                node_id: "local-node".to_string(),
                node_name: "primary".to_string(),
                is_primary: true,
                api_endpoint: "http://127.0.0.1:3000".to_string(),
                node_api_key: new_id(),
                primary_url: None,
                apps_root: dir.path().to_path_buf(),
                database_url: ":memory:".to_string(),
                database_auth_token: None,
                api_token: "dev-token".to_string(),
                port: 3000,
                max_description_len: 2048,
            },
            store,
        );
        (state, dir)
    }

    #[tokio::test]
    async fn empty_node_id_is_treated_as_local() {
        let (state, _dir) = test_state().await;
        assert!(is_local(&state, ""));
    }

    #[tokio::test]
    async fn own_node_id_resolves_local() {
        let (state, _dir) = test_state().await;
        assert!(matches!(
            resolve_target(&state, "local-node").await.unwrap(),
            RouteTarget::Local
        ));
    }

    #[tokio::test]
    async fn unknown_remote_node_id_is_not_found() {
        let (state, _dir) = test_state().await;
        let err = resolve_target(&state, "ghost-node").await.unwrap_err();
        assert!(matches!(err, FleetError::NotFound(_)));
    }

    #[tokio::test]
    async fn known_remote_node_id_resolves_remote() {
        let (state, _dir) = test_state().await;
        let conn = state.store.conn().unwrap();
        let remote = Node {
            id: "secondary-1".to_string(),
            name: "secondary".to_string(),
            api_endpoint: "http://127.0.0.1:3001".to_string(),
            api_key: new_id(),
            is_primary: false,
            status: NodeStatus::Online,
            last_seen: None,
            last_health_check: None,
            consecutive_failures: 0,
        };
        NodeRepository::insert(&conn, &remote).await.unwrap();

        match resolve_target(&state, "secondary-1").await.unwrap() {
            RouteTarget::Remote(node) => assert_eq!(node.id, "secondary-1"),
            RouteTarget::Local => panic!("expected a remote target"),
        }
    }
}
