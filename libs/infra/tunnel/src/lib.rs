//! Reverse-tunnel and DNS provisioning against a Cloudflare-shaped API.

mod cloudflare;
mod provider;

pub use cloudflare::CloudflareTunnelProvider;
pub use provider::{with_catch_all, ProvisionedTunnel, TunnelProvider, CATCH_ALL_SERVICE};
