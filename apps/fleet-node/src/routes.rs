// [apps/fleet-node/src/routes.rs]
/*!
 * =================================================================
 * APARATO: ENSAMBLADO DE RUTAS HTTP (ESTRATO L2)
 * CLASIFICACIÓN: API SURFACE
 * RESPONSABILIDAD: CABLEADO DE HANDLERS, CAPAS Y AUTENTICACIÓN
 * =================================================================
 */

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{apps, containers, health, internal, nodes, stats};
use crate::middleware::{auth_guard, node_auth_guard};
use crate::state::AppState;

/// The public, bearer-token-gated surface plus the primary-only node
/// registry. Wired separately from `internal_router` so the two auth
/// schemes never cross paths.
fn api_router(state: AppState) -> Router<AppState> {
    let mut router = Router::new()
        .route("/apps", get(apps::list_apps).post(apps::create_app))
        .route(
            "/apps/:id",
            get(apps::get_app).put(apps::update_app).delete(apps::delete_app),
        )
        .route("/apps/:id/start", post(apps::start_app))
        .route("/apps/:id/stop", post(apps::stop_app))
        .route("/apps/:id/update", post(apps::update_containers))
        .route("/apps/:id/repair", post(apps::repair_app))
        .route("/apps/:id/logs", get(apps::app_logs))
        .route("/apps/:id/compose/versions", get(apps::list_versions))
        .route("/apps/:id/compose/versions/:version", get(apps::get_version))
        .route(
            "/apps/:id/compose/rollback/:version",
            post(apps::rollback_version),
        )
        .route("/stats/system", get(stats::system_stats))
        .route("/stats/containers", get(stats::container_stats))
        .route("/containers/:id/restart", post(containers::restart_container))
        .route("/containers/:id/stop", post(containers::stop_container));

    if state.config.is_primary {
        router = router
            .route("/nodes", get(nodes::list_nodes).post(nodes::create_node))
            .route(
                "/nodes/:id",
                get(nodes::get_node).put(nodes::update_node).delete(nodes::delete_node),
            )
            .route("/nodes/:id/check", post(nodes::check_node));
    }

    router.layer(middleware::from_fn_with_state(state, auth_guard))
}

/// The worker-to-worker surface: every route here trusts `X-Node-ID` /
/// `X-Node-API-Key` instead of the bearer token.
fn internal_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/apps", get(internal::list_local_apps).post(apps::create_app))
        .route("/apps/:id", get(apps::get_app))
        .route("/apps/:id/edit", post(apps::update_app))
        .route("/apps/:id/delete", post(apps::delete_app))
        .route("/apps/:id/start", post(apps::start_app))
        .route("/apps/:id/stop", post(apps::stop_app))
        .route("/apps/:id/update-containers", post(apps::update_containers))
        .route("/apps/:id/repair", post(apps::repair_app))
        .route("/apps/:id/logs", get(apps::app_logs))
        .route("/apps/:id/compose/versions", get(apps::list_versions))
        .route("/apps/:id/compose/versions/:version", get(apps::get_version))
        .route(
            "/apps/:id/compose/rollback/:version",
            post(apps::rollback_version),
        )
        .route("/system/stats", get(internal::system_stats))
        .route("/containers/stats", get(internal::container_stats))
        .route("/containers/:id/restart", post(internal::restart_container))
        .route("/containers/:id/stop", post(internal::stop_container))
        .route("/settings", get(internal::settings))
        .route("/nodes/:id/heartbeat", post(internal::heartbeat))
        .layer(middleware::from_fn_with_state(state, node_auth_guard))
}

pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .nest("/api", api_router(state.clone()))
        .nest("/api/internal", internal_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

