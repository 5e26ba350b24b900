use std::future::Future;
use std::pin::Pin;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;

use fleet_domain_models::FleetError;

use crate::dto::NodeIdQuery;
use crate::error_response::{ApiError, ApiResult};
use crate::peer;
use crate::router::{resolve_target, RouteTarget};
use crate::services::stats::StatsService;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct ContainerActionResponse {
    pub ok: bool,
}

type BoxedOp<'a> = Pin<Box<dyn Future<Output = Result<(), FleetError>> + Send + 'a>>;

/// Container actions address a container id directly, with no app lookup to
/// find its owning node — the caller already knows it from a prior stats
/// read, so it's carried as `node_id` the same way fleet-wide reads are.
async fn dispatch<'a, F>(
    state: &'a AppState,
    query: &NodeIdQuery,
    mirror_path: &str,
    local: F,
) -> ApiResult<Json<ContainerActionResponse>>
where
    F: FnOnce() -> BoxedOp<'a>,
{
    let node_id = query.targets().into_iter().next().unwrap_or_default();
    match resolve_target(state, &node_id).await.map_err(ApiError::from)? {
        RouteTarget::Local => {
            local().await.map_err(ApiError::from)?;
        }
        RouteTarget::Remote(node) => {
            peer::post_empty(state, &node, mirror_path).await.map_err(ApiError::from)?;
        }
    }
    Ok(Json(ContainerActionResponse { ok: true }))
}

pub async fn restart_container(
    State(state): State<AppState>,
    Path(container_id): Path<String>,
    Query(query): Query<NodeIdQuery>,
) -> ApiResult<Json<ContainerActionResponse>> {
    let path = format!("/api/internal/containers/{container_id}/restart");
    dispatch(&state, &query, &path, || {
        Box::pin(StatsService::restart_container(&state, &container_id))
    })
    .await
}

pub async fn stop_container(
    State(state): State<AppState>,
    Path(container_id): Path<String>,
    Query(query): Query<NodeIdQuery>,
) -> ApiResult<Json<ContainerActionResponse>> {
    let path = format!("/api/internal/containers/{container_id}/stop");
    dispatch(&state, &query, &path, || {
        Box::pin(StatsService::stop_container(&state, &container_id))
    })
    .await
}

