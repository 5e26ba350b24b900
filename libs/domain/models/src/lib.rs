//! Shared data-transfer objects for the fleet control plane.
//!
//! These types cross every boundary in the workspace: wire format for the
//! HTTP/RPC surfaces, row shape for the persistence store, and the argument
//! types domain services operate on.

pub mod app;
pub mod compose_version;
pub mod error;
pub mod ingress;
pub mod node;
pub mod settings;
pub mod tunnel;

pub use app::{App, AppStatus, CreateAppRequest, UpdateAppRequest};
pub use compose_version::{ComposeVersion, RollbackRequest};
pub use error::FleetError;
pub use ingress::IngressRule;
pub use node::{CreateNodeRequest, Node, NodeStatus, UpdateNodeRequest};
pub use settings::Settings;
pub use tunnel::{TunnelRecord, TunnelStatus};

/// Generates a new opaque, cluster-unique identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
