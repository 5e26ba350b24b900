use axum::Json;

use crate::dto::HealthResponse;

/// Unauthenticated liveness probe.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
