use thiserror::Error;

/// The full error taxonomy surfaced by every domain service. The HTTP layer
/// maps each variant to a status code; nothing downstream of a service call
/// should need to inspect anything but the variant tag.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid compose document: {0}")]
    ComposeInvalid(String),

    #[error("tunnel provider is not configured")]
    TunnelNotConfigured,

    #[error("tunnel creation failed: {0}")]
    TunnelCreationFailed(String),

    #[error("container operation failed: {0}")]
    ContainerOperationFailed(String),

    #[error("database operation failed: {0}")]
    DatabaseOperation(String),

    #[error("node unreachable: {0}")]
    NodeUnreachable(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

pub type FleetResult<T> = Result<T, FleetError>;
