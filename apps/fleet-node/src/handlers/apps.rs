use axum::extract::{Path, Query, State};
use axum::Json;

use fleet_domain_models::{App, ComposeVersion, CreateAppRequest, FleetError, RollbackRequest, UpdateAppRequest};
use fleet_infra_container::ContainerAdapter;
use fleet_infra_store::ComposeVersionRepository;

use crate::aggregator;
use crate::dto::{CleanupReport, LogsQuery, NodeIdQuery};
use crate::error_response::{ApiError, ApiResult};
use crate::peer;
use crate::router::{resolve_target, RouteTarget};
use crate::services::lifecycle::AppLifecycleService;
use crate::state::AppState;

pub async fn list_apps(
    State(state): State<AppState>,
    Query(query): Query<NodeIdQuery>,
) -> ApiResult<Json<Vec<App>>> {
    let targets = aggregator::determine_targets(&state, &query.targets()).await?;
    let apps = aggregator::aggregate_apps(&state, &targets).await?;
    Ok(Json(apps))
}

pub async fn create_app(
    State(state): State<AppState>,
    Query(query): Query<NodeIdQuery>,
    Json(mut req): Json<CreateAppRequest>,
) -> ApiResult<Json<App>> {
    if req.target_node.is_none() {
        req.target_node = query.targets().into_iter().next();
    }
    let app = AppLifecycleService::create(&state, req).await?;
    Ok(Json(app))
}

pub async fn get_app(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<App>> {
    let app = AppLifecycleService::get(&state, &id).await?;
    Ok(Json(app))
}

pub async fn update_app(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAppRequest>,
) -> ApiResult<Json<App>> {
    let app = AppLifecycleService::update(&state, &id, req).await?;
    Ok(Json(app))
}

pub async fn delete_app(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CleanupReport>> {
    let report = AppLifecycleService::delete(&state, &id).await?;
    Ok(Json(report))
}

pub async fn start_app(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<App>> {
    Ok(Json(AppLifecycleService::start(&state, &id).await?))
}

pub async fn stop_app(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<App>> {
    Ok(Json(AppLifecycleService::stop(&state, &id).await?))
}

pub async fn update_containers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<App>> {
    Ok(Json(AppLifecycleService::update_containers(&state, &id).await?))
}

pub async fn repair_app(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<App>> {
    Ok(Json(AppLifecycleService::repair(&state, &id).await?))
}

pub async fn app_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<Vec<String>>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let app = fleet_infra_store::AppRepository::get(&conn, &id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(FleetError::NotFound(format!("app {id}"))))?;

    let lines = match resolve_target(&state, &app.node_id).await.map_err(ApiError::from)? {
        RouteTarget::Local => state.container.logs(&app.name, query.tail).await.map_err(ApiError::from)?,
        RouteTarget::Remote(node) => peer::get(&state, &node, &format!("/api/internal/apps/{id}/logs?tail={}", query.tail))
            .await
            .map_err(ApiError::from)?,
    };
    Ok(Json(lines))
}

pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ComposeVersion>>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let app = fleet_infra_store::AppRepository::get(&conn, &id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(FleetError::NotFound(format!("app {id}"))))?;

    let versions = match resolve_target(&state, &app.node_id).await.map_err(ApiError::from)? {
        RouteTarget::Local => ComposeVersionRepository::list(&conn, &id).await.map_err(ApiError::from)?,
        RouteTarget::Remote(node) => peer::get(&state, &node, &format!("/api/internal/apps/{id}/compose/versions"))
            .await
            .map_err(ApiError::from)?,
    };
    Ok(Json(versions))
}

pub async fn get_version(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, i64)>,
) -> ApiResult<Json<ComposeVersion>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let app = fleet_infra_store::AppRepository::get(&conn, &id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(FleetError::NotFound(format!("app {id}"))))?;

    let found = match resolve_target(&state, &app.node_id).await.map_err(ApiError::from)? {
        RouteTarget::Local => ComposeVersionRepository::get(&conn, &id, version)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::from(FleetError::NotFound(format!("version {version} of app {id}"))))?,
        RouteTarget::Remote(node) => peer::get(
            &state,
            &node,
            &format!("/api/internal/apps/{id}/compose/versions/{version}"),
        )
        .await
        .map_err(ApiError::from)?,
    };
    Ok(Json(found))
}

pub async fn rollback_version(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, i64)>,
    Json(req): Json<RollbackRequest>,
) -> ApiResult<Json<App>> {
    let app = AppLifecycleService::rollback(&state, &id, version, req).await?;
    Ok(Json(app))
}
