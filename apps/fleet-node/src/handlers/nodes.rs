use axum::extract::{Path, State};
use axum::Json;

use fleet_domain_models::{CreateNodeRequest, FleetError, Node, NodeStatus, UpdateNodeRequest};
use fleet_infra_store::NodeRepository;

use crate::error_response::{ApiError, ApiResult};
use crate::health;
use crate::state::AppState;

pub async fn list_nodes(State(state): State<AppState>) -> ApiResult<Json<Vec<Node>>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let nodes = NodeRepository::list_all(&conn).await.map_err(ApiError::from)?;
    Ok(Json(nodes))
}

pub async fn create_node(
    State(state): State<AppState>,
    Json(req): Json<CreateNodeRequest>,
) -> ApiResult<Json<Node>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let node = Node {
        id: fleet_domain_models::new_id(),
        name: req.name,
        api_endpoint: req.api_endpoint,
        api_key: req.api_key,
        is_primary: req.is_primary,
        status: NodeStatus::Online,
        last_seen: None,
        last_health_check: None,
        consecutive_failures: 0,
    };
    NodeRepository::insert(&conn, &node).await.map_err(ApiError::from)?;
    Ok(Json(node))
}

pub async fn get_node(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Node>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let node = NodeRepository::get(&conn, &id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(FleetError::NotFound(format!("node {id}"))))?;
    Ok(Json(node))
}

pub async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateNodeRequest>,
) -> ApiResult<Json<Node>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let mut node = NodeRepository::get(&conn, &id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(FleetError::NotFound(format!("node {id}"))))?;

    if let Some(name) = req.name {
        node.name = name;
    }
    if let Some(api_endpoint) = req.api_endpoint {
        node.api_endpoint = api_endpoint;
    }
    if let Some(api_key) = req.api_key {
        node.api_key = api_key;
    }
    NodeRepository::update(&conn, &node).await.map_err(ApiError::from)?;
    Ok(Json(node))
}

pub async fn delete_node(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<()>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let node = NodeRepository::get(&conn, &id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(FleetError::NotFound(format!("node {id}"))))?;
    if node.is_primary {
        return Err(ApiError::from(FleetError::Validation(
            "cannot delete the primary node".to_string(),
        )));
    }
    NodeRepository::delete(&conn, &id).await.map_err(ApiError::from)?;
    Ok(Json(()))
}

pub async fn check_node(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Node>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let node = NodeRepository::get(&conn, &id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(FleetError::NotFound(format!("node {id}"))))?;
    health::manual_check(&state, &node).await.map_err(ApiError::from)?;
    let refreshed = NodeRepository::get(&conn, &id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(FleetError::NotFound(format!("node {id}"))))?;
    Ok(Json(refreshed))
}
