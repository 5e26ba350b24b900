//! Typed compose document parsing and tunnel-sidecar injection.
//!
//! Every mutation goes through [`document::ComposeDocument`] and is
//! re-serialized; nothing here regex-patches raw YAML text.

mod document;
mod injector;

pub use document::{ComposeDocument, EnvironmentField, Network, NetworksField, Service};
pub use injector::{
    has_sidecar, inject_sidecar, parse, remove_sidecar, serialize, SIDECAR_SERVICE_NAME,
};
