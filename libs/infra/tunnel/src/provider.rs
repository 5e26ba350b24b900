// [libs/infra/tunnel/src/provider.rs]
/*!
 * =================================================================
 * APARATO: CONTRATO DE PROVISIÓN DE TÚNELES (ESTRATO L3)
 * CLASIFICACIÓN: INFRASTRUCTURE PORT
 * RESPONSABILIDAD: ABSTRACCIÓN DEL PROVEEDOR DE TÚNEL REVERSO Y DNS
 *
 * Reducido a lo que los servicios de ciclo de vida y de túnel
 * necesitan. Una sola implementación habla con la API de Cloudflare;
 * las pruebas sustituyen un proveedor falso.
 * =================================================================
 */

use async_trait::async_trait;

use fleet_domain_models::{FleetError, IngressRule};

/// The catch-all rule every ingress configuration must end with.
pub const CATCH_ALL_SERVICE: &str = "http_status:404";

/// A single provisioned tunnel, as returned by tunnel creation.
#[derive(Debug, Clone)]
pub struct ProvisionedTunnel {
    pub tunnel_id: String,
    pub tunnel_token: String,
}

/// Reverse-tunnel and DNS provisioning, narrowed to what the lifecycle and
/// tunnel services need. One implementation talks to Cloudflare's API;
/// tests substitute a fake.
#[async_trait]
pub trait TunnelProvider: Send + Sync {
    async fn create_tunnel(&self, account_id: &str, name: &str) -> Result<ProvisionedTunnel, FleetError>;

    async fn get_tunnel_token(&self, account_id: &str, tunnel_id: &str) -> Result<String, FleetError>;

    /// Programs `rules` as the tunnel's ingress configuration. Appends the
    /// catch-all rule if the caller didn't already include one.
    async fn update_ingress(
        &self,
        account_id: &str,
        tunnel_id: &str,
        rules: &[IngressRule],
    ) -> Result<(), FleetError>;

    /// Deletes a tunnel. Treats "not found" as success.
    async fn delete_tunnel(&self, account_id: &str, tunnel_id: &str) -> Result<(), FleetError>;

    /// Resolves the zone id owning `domain`.
    async fn get_zone_id(&self, domain: &str) -> Result<String, FleetError>;

    /// Lists every zone id reachable by `account_id`. Used to enumerate all
    /// zones when deleting a tunnel, rather than guessing a single zone from
    /// an ingress hostname.
    async fn list_zones(&self, account_id: &str) -> Result<Vec<String>, FleetError>;

    /// Creates a proxied CNAME for `hostname` pointing at the tunnel. A
    /// pre-existing matching record is treated as success.
    async fn create_dns_record(
        &self,
        zone_id: &str,
        hostname: &str,
        tunnel_id: &str,
    ) -> Result<(), FleetError>;

    /// Deletes every DNS record in `zone_id` that targets `tunnel_id`.
    /// Treats "not found" as success.
    async fn delete_dns_records_for_tunnel(
        &self,
        zone_id: &str,
        tunnel_id: &str,
    ) -> Result<(), FleetError>;
}

/// Builds the final ingress rule list, appending the catch-all if absent.
pub fn with_catch_all(rules: &[IngressRule]) -> Vec<IngressRule> {
    let mut rules = rules.to_vec();
    let has_catch_all = rules
        .last()
        .map(|r| r.service == CATCH_ALL_SERVICE)
        .unwrap_or(false);
    if !has_catch_all {
        rules.push(IngressRule {
            hostname: String::new(),
            path: None,
            service: CATCH_ALL_SERVICE.to_string(),
            origin_server_name: None,
            no_tls_verify: false,
        });
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(hostname: &str) -> IngressRule {
        IngressRule {
            hostname: hostname.to_string(),
            path: None,
            service: "http://web:80".to_string(),
            origin_server_name: None,
            no_tls_verify: false,
        }
    }

    #[test]
    fn appends_catch_all_when_missing() {
        let rules = with_catch_all(&[rule("app.example.com")]);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules.last().unwrap().service, CATCH_ALL_SERVICE);
    }

    #[test]
    fn does_not_duplicate_an_existing_catch_all() {
        let mut rules = vec![rule("app.example.com")];
        rules.push(IngressRule {
            hostname: String::new(),
            path: None,
            service: CATCH_ALL_SERVICE.to_string(),
            origin_server_name: None,
            no_tls_verify: false,
        });
        let result = with_catch_all(&rules);
        assert_eq!(result.len(), 2);
    }
}
