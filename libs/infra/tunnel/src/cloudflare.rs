// [libs/infra/tunnel/src/cloudflare.rs]
/*!
 * =================================================================
 * APARATO: ADAPTADOR CLOUDFLARE TUNNEL (ESTRATO L3)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER
 * RESPONSABILIDAD: EJECUCIÓN CONTRA LA API REST DE CLOUDFLARE
 *
 * Toda llamada es idempotente frente a los códigos de "ya existe" /
 * "no encontrado" de Cloudflare: una operación de borrado contra un
 * recurso que ya no existe se trata como éxito, nunca como fallo.
 * =================================================================
 */

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{instrument, warn};

use fleet_domain_models::{FleetError, IngressRule};

use crate::provider::{with_catch_all, ProvisionedTunnel, TunnelProvider};

const API_BASE: &str = "https://api.cloudflare.com/client/v4";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    message: String,
}

impl ApiError {
    /// Cloudflare's "already exists" / "not found" codes, which every
    /// adapter method here treats as a successful no-op.
    fn is_not_found_or_duplicate(&self) -> bool {
        matches!(self.code, 1003 | 81057 | 1432)
    }
}

/// Talks to the Cloudflare Tunnel + DNS APIs over `reqwest`.
pub struct CloudflareTunnelProvider {
    client: Client,
    api_token: String,
}

impl CloudflareTunnelProvider {
    pub fn new(api_token: String) -> Self {
        Self {
            client: Client::new(),
            api_token,
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.api_token)
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<ApiResponse<T>, FleetError> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(|e| FleetError::TunnelCreationFailed(e.to_string()))?;
        let status = response.status();
        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| FleetError::TunnelCreationFailed(format!("bad response body: {e}")))?;
        if !body.success && status != StatusCode::NOT_FOUND {
            warn!(?status, errors = ?body.errors, "cloudflare api call failed");
        }
        Ok(body)
    }
}

#[async_trait]
impl TunnelProvider for CloudflareTunnelProvider {
    #[instrument(skip(self))]
    async fn create_tunnel(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<ProvisionedTunnel, FleetError> {
        #[derive(Deserialize)]
        struct CreateResult {
            id: String,
        }

        let url = format!("{API_BASE}/accounts/{account_id}/cfd_tunnel");
        let body = json!({
            "name": name,
            "config_src": "cloudflare",
        });
        let response: ApiResponse<CreateResult> =
            self.send(self.client.post(url).json(&body)).await?;

        let result = response
            .result
            .ok_or_else(|| FleetError::TunnelCreationFailed("no tunnel id in response".into()))?;

        let tunnel_token = self.get_tunnel_token(account_id, &result.id).await?;
        Ok(ProvisionedTunnel {
            tunnel_id: result.id,
            tunnel_token,
        })
    }

    async fn get_tunnel_token(&self, account_id: &str, tunnel_id: &str) -> Result<String, FleetError> {
        let url = format!("{API_BASE}/accounts/{account_id}/cfd_tunnel/{tunnel_id}/token");
        let response: ApiResponse<String> = self.send(self.client.get(url)).await?;
        response
            .result
            .ok_or_else(|| FleetError::TunnelCreationFailed("no token in response".into()))
    }

    #[instrument(skip(self, rules))]
    async fn update_ingress(
        &self,
        account_id: &str,
        tunnel_id: &str,
        rules: &[IngressRule],
    ) -> Result<(), FleetError> {
        let ingress: Vec<_> = with_catch_all(rules)
            .into_iter()
            .map(|rule| {
                json!({
                    "hostname": if rule.hostname.is_empty() { serde_json::Value::Null } else { serde_json::Value::String(rule.hostname) },
                    "path": rule.path,
                    "service": rule.service,
                    "originRequest": {
                        "originServerName": rule.origin_server_name,
                        "noTLSVerify": rule.no_tls_verify,
                    },
                })
            })
            .collect();

        let url = format!(
            "{API_BASE}/accounts/{account_id}/cfd_tunnel/{tunnel_id}/configurations"
        );
        let body = json!({ "config": { "ingress": ingress } });
        let response: ApiResponse<serde_json::Value> =
            self.send(self.client.put(url).json(&body)).await?;
        if !response.success {
            return Err(FleetError::TunnelCreationFailed(format!(
                "ingress update rejected: {:?}",
                response.errors
            )));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_tunnel(&self, account_id: &str, tunnel_id: &str) -> Result<(), FleetError> {
        let url = format!("{API_BASE}/accounts/{account_id}/cfd_tunnel/{tunnel_id}");
        let response: ApiResponse<serde_json::Value> =
            self.send(self.client.delete(url)).await?;
        if response.success || response.errors.iter().any(ApiError::is_not_found_or_duplicate) {
            return Ok(());
        }
        Err(FleetError::TunnelCreationFailed(format!(
            "tunnel delete failed: {:?}",
            response.errors
        )))
    }

    async fn get_zone_id(&self, domain: &str) -> Result<String, FleetError> {
        #[derive(Deserialize)]
        struct Zone {
            id: String,
        }

        let url = format!("{API_BASE}/zones?name={domain}");
        let response: ApiResponse<Vec<Zone>> = self.send(self.client.get(url)).await?;
        response
            .result
            .and_then(|zones| zones.into_iter().next())
            .map(|zone| zone.id)
            .ok_or_else(|| FleetError::TunnelCreationFailed(format!("no zone found for {domain}")))
    }

    #[instrument(skip(self))]
    async fn list_zones(&self, account_id: &str) -> Result<Vec<String>, FleetError> {
        #[derive(Deserialize)]
        struct Zone {
            id: String,
        }

        let url = format!("{API_BASE}/zones?account.id={account_id}&per_page=50");
        let response: ApiResponse<Vec<Zone>> = self.send(self.client.get(url)).await?;
        Ok(response
            .result
            .unwrap_or_default()
            .into_iter()
            .map(|zone| zone.id)
            .collect())
    }

    #[instrument(skip(self))]
    async fn create_dns_record(
        &self,
        zone_id: &str,
        hostname: &str,
        tunnel_id: &str,
    ) -> Result<(), FleetError> {
        let url = format!("{API_BASE}/zones/{zone_id}/dns_records");
        let body = json!({
            "type": "CNAME",
            "name": hostname,
            "content": format!("{tunnel_id}.cfargotunnel.com"),
            "proxied": true,
        });
        let response: ApiResponse<serde_json::Value> =
            self.send(self.client.post(url).json(&body)).await?;
        if response.success || response.errors.iter().any(ApiError::is_not_found_or_duplicate) {
            return Ok(());
        }
        Err(FleetError::TunnelCreationFailed(format!(
            "dns record create failed: {:?}",
            response.errors
        )))
    }

    #[instrument(skip(self))]
    async fn delete_dns_records_for_tunnel(
        &self,
        zone_id: &str,
        tunnel_id: &str,
    ) -> Result<(), FleetError> {
        #[derive(Deserialize)]
        struct DnsRecord {
            id: String,
            content: String,
        }

        let target = format!("{tunnel_id}.cfargotunnel.com");
        let list_url = format!("{API_BASE}/zones/{zone_id}/dns_records?type=CNAME");
        let response: ApiResponse<Vec<DnsRecord>> = self.send(self.client.get(list_url)).await?;
        let records = response.result.unwrap_or_default();

        for record in records.into_iter().filter(|r| r.content == target) {
            let delete_url = format!("{API_BASE}/zones/{zone_id}/dns_records/{}", record.id);
            let delete_response: ApiResponse<serde_json::Value> =
                self.send(self.client.delete(delete_url)).await?;
            if !delete_response.success
                && !delete_response
                    .errors
                    .iter()
                    .any(ApiError::is_not_found_or_duplicate)
            {
                return Err(FleetError::TunnelCreationFailed(format!(
                    "dns record delete failed: {:?}",
                    delete_response.errors
                )));
            }
        }
        Ok(())
    }
}
