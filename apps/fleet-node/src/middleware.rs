use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;

use fleet_infra_store::NodeRepository;

use crate::state::AppState;

/// Gate for the user-facing `/api/*` surface: a bearer token matching
/// `Config::api_token`.
pub async fn auth_guard(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, StatusCode> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match token {
        Some(t) if t == state.config.api_token => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Gate for `/api/internal/*`: the caller presents `X-Node-ID` and
/// `X-Node-API-Key`, matched against the Node row.
pub async fn node_auth_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let node_id = req
        .headers()
        .get("X-Node-ID")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    let api_key = req
        .headers()
        .get("X-Node-API-Key")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let (Some(node_id), Some(api_key)) = (node_id, api_key) else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let conn = state.store.conn().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let node = NodeRepository::get(&conn, &node_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    match node {
        Some(node) if node.api_key == api_key => Ok(next.run(req).await),
        _ => Err(StatusCode::FORBIDDEN),
    }
}
