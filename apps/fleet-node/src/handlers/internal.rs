use axum::extract::{Path, State};
use axum::Json;

use fleet_domain_models::{App, Settings};
use fleet_infra_container::ContainerStats;
use fleet_infra_store::{AppRepository, SettingsRepository};

use crate::dto::SystemStats;
use crate::error_response::{ApiError, ApiResult};
use crate::health;
use crate::services::stats::StatsService;
use crate::state::AppState;

/// Local-only app list, used by the aggregator's fan-out rather than the
/// public, fleet-aggregated `GET /api/apps`.
pub async fn list_local_apps(State(state): State<AppState>) -> ApiResult<Json<Vec<App>>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let apps = AppRepository::list_by_node(&conn, &state.config.node_id)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(apps))
}

pub async fn system_stats(State(_state): State<AppState>) -> Json<SystemStats> {
    Json(StatsService::system_stats())
}

pub async fn container_stats(State(state): State<AppState>) -> ApiResult<Json<Vec<ContainerStats>>> {
    let stats = StatsService::container_stats(&state).await.map_err(ApiError::from)?;
    Ok(Json(stats))
}

pub async fn settings(State(state): State<AppState>) -> ApiResult<Json<Settings>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let settings = SettingsRepository::get(&conn).await.map_err(ApiError::from)?;
    Ok(Json(settings))
}

/// A worker announces it's alive; resets its failure counter immediately
/// rather than waiting for the next scheduled probe.
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> ApiResult<Json<()>> {
    health::record_heartbeat(&state, &node_id).await.map_err(ApiError::from)?;
    Ok(Json(()))
}

pub async fn restart_container(
    State(state): State<AppState>,
    Path(container_id): Path<String>,
) -> ApiResult<Json<()>> {
    StatsService::restart_container(&state, &container_id)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(()))
}

pub async fn stop_container(
    State(state): State<AppState>,
    Path(container_id): Path<String>,
) -> ApiResult<Json<()>> {
    StatsService::stop_container(&state, &container_id)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(()))
}
