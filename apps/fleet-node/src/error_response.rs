use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use fleet_domain_models::FleetError;

/// Maps the shared error taxonomy onto the HTTP status table in the error
/// handling design: each variant carries its own status, body is always
/// `{"error": <message>}`.
pub struct ApiError(pub FleetError);

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FleetError::NotFound(_) => StatusCode::NOT_FOUND,
            FleetError::Validation(_) => StatusCode::BAD_REQUEST,
            FleetError::ComposeInvalid(_) => StatusCode::BAD_REQUEST,
            FleetError::TunnelNotConfigured => StatusCode::CONFLICT,
            FleetError::TunnelCreationFailed(_) => StatusCode::BAD_GATEWAY,
            FleetError::ContainerOperationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FleetError::DatabaseOperation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FleetError::NodeUnreachable(_) => StatusCode::BAD_GATEWAY,
            FleetError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
