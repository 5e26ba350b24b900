// [apps/fleet-node/src/peer.rs]
/*!
 * =================================================================
 * APARATO: CLIENTE INTER-NODO (ESTRATO L3)
 * CLASIFICACIÓN: NETWORK PORT
 * RESPONSABILIDAD: COMUNICACIÓN HTTP AUTENTICADA ENTRE NODOS
 * =================================================================
 */

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use fleet_domain_models::{FleetError, Node};

use crate::state::AppState;

const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Issues an authenticated RPC to `node`, wrapping transport and deadline
/// failures as `NodeUnreachable` per the router's contract.
async fn request<B: Serialize, R: DeserializeOwned>(
    state: &AppState,
    node: &Node,
    method: reqwest::Method,
    path: &str,
    body: Option<&B>,
) -> Result<R, FleetError> {
    let url = format!("{}{path}", node.api_endpoint.trim_end_matches('/'));
    let mut builder = state
        .http
        .request(method, url)
        .timeout(RPC_TIMEOUT)
        .header("X-Node-ID", &state.config.node_id)
        .header("X-Node-API-Key", &state.config.node_api_key);
    if let Some(body) = body {
        builder = builder.json(body);
    }

    let response = builder.send().await.map_err(|e| {
        warn!(node_id = %node.id, error = %e, "peer rpc failed");
        FleetError::NodeUnreachable(format!("{}: {e}", node.name))
    })?;

    if !response.status().is_success() {
        return Err(FleetError::NodeUnreachable(format!(
            "{} returned {}",
            node.name,
            response.status()
        )));
    }

    response
        .json::<R>()
        .await
        .map_err(|e| FleetError::NodeUnreachable(format!("{}: bad response body: {e}", node.name)))
}

pub async fn get<R: DeserializeOwned>(state: &AppState, node: &Node, path: &str) -> Result<R, FleetError> {
    request::<(), R>(state, node, reqwest::Method::GET, path, None).await
}

pub async fn post<B: Serialize, R: DeserializeOwned>(
    state: &AppState,
    node: &Node,
    path: &str,
    body: &B,
) -> Result<R, FleetError> {
    request(state, node, reqwest::Method::POST, path, Some(body)).await
}

pub async fn post_empty(state: &AppState, node: &Node, path: &str) -> Result<(), FleetError> {
    request::<(), serde_json::Value>(state, node, reqwest::Method::POST, path, None)
        .await
        .map(|_| ())
}
