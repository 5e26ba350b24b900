use serde::{Deserialize, Serialize};

/// One ordered `(hostname, path?, service url)` rule programmed into a
/// tunnel. First match wins; the list is terminated by a catch-all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngressRule {
    pub hostname: String,
    pub path: Option<String>,
    pub service: String,
    #[serde(default)]
    pub origin_server_name: Option<String>,
    #[serde(default)]
    pub no_tls_verify: bool,
}
