// [apps/fleet-node/src/services/tunnel.rs]
/*!
 * =================================================================
 * APARATO: SERVICIO DE TÚNELES CLOUDFLARE (ESTRATO L4)
 * CLASIFICACIÓN: DOMAIN SERVICE
 * RESPONSABILIDAD: CICLO DE VIDA DEL TÚNEL Y LIMPIEZA DE DNS
 *
 * Toda operación de proveedor pasa por `TunnelProvider`; sin
 * credenciales de nube en el registro de ajustes, el servicio
 * responde con `TunnelNotConfigured` en vez de fallar a ciegas.
 * =================================================================
 */

use chrono::Utc;
use tracing::instrument;

use fleet_domain_models::{FleetError, IngressRule, TunnelRecord, TunnelStatus};
use fleet_infra_store::TunnelRepository;
use fleet_infra_tunnel::TunnelProvider;

use crate::state::AppState;

/// Per-app tunnel operations, all keyed by `app_id` through its
/// `TunnelRecord`. Every provider call is routed through the configured
/// `TunnelProvider`; callers get `TunnelNotConfigured` if no credentials are
/// on file.
pub struct TunnelService;

impl TunnelService {
    pub async fn get(state: &AppState, app_id: &str) -> Result<Option<TunnelRecord>, FleetError> {
        let conn = state.store.conn()?;
        TunnelRepository::get(&conn, app_id).await
    }

    pub async fn list_active(state: &AppState) -> Result<Vec<TunnelRecord>, FleetError> {
        let conn = state.store.conn()?;
        TunnelRepository::list_active(&conn).await
    }

    /// Translates `rules` into the provider's wire format and submits it.
    /// The provider appends the catch-all; order is preserved.
    #[instrument(skip(state, rules))]
    pub async fn update_ingress(
        state: &AppState,
        app_id: &str,
        rules: &[IngressRule],
    ) -> Result<(), FleetError> {
        let conn = state.store.conn()?;
        let mut record = TunnelRepository::get(&conn, app_id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("tunnel for app {app_id}")))?;

        let provider = state
            .tunnel_provider()
            .await?
            .ok_or(FleetError::TunnelNotConfigured)?;
        provider
            .update_ingress(&record.account_id, &record.tunnel_id, rules)
            .await?;

        record.ingress_rules = rules.to_vec();
        record.last_synced_at = Some(Utc::now());
        TunnelRepository::upsert(&conn, &record).await
    }

    /// Resolves `domain`'s zone and creates a proxied CNAME for `hostname`
    /// pointing at the app's tunnel. A pre-existing matching record is a
    /// no-op by the provider's own idempotence contract.
    #[instrument(skip(state))]
    pub async fn create_dns_record(
        state: &AppState,
        app_id: &str,
        hostname: &str,
        domain: &str,
    ) -> Result<(), FleetError> {
        let conn = state.store.conn()?;
        let record = TunnelRepository::get(&conn, app_id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("tunnel for app {app_id}")))?;

        let provider = state
            .tunnel_provider()
            .await?
            .ok_or(FleetError::TunnelNotConfigured)?;
        let zone_id = provider.get_zone_id(domain).await?;
        provider
            .create_dns_record(&zone_id, hostname, &record.tunnel_id)
            .await
    }

    /// Fetches provider-side state for the tunnel and refreshes
    /// `status`/`last_synced_at`. There is no provider "get tunnel" probe
    /// narrower than re-verifying the token, so a token fetch doubles as the
    /// liveness check.
    #[instrument(skip(state))]
    pub async fn sync_status(state: &AppState, app_id: &str) -> Result<TunnelRecord, FleetError> {
        let conn = state.store.conn()?;
        let mut record = TunnelRepository::get(&conn, app_id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("tunnel for app {app_id}")))?;

        let provider = state
            .tunnel_provider()
            .await?
            .ok_or(FleetError::TunnelNotConfigured)?;

        match provider
            .get_tunnel_token(&record.account_id, &record.tunnel_id)
            .await
        {
            Ok(_) => {
                record.status = TunnelStatus::Active;
                record.error_details = None;
            }
            Err(e) => {
                record.status = TunnelStatus::Error;
                record.error_details = Some(e.to_string());
            }
        }
        record.last_synced_at = Some(Utc::now());
        TunnelRepository::upsert(&conn, &record).await?;
        Ok(record)
    }

    /// Marks the record inactive, deletes every DNS record pointing at the
    /// tunnel, then deletes the tunnel itself. DNS first, so a failed
    /// tunnel delete never leaves an orphaned CNAME. Each step tolerates
    /// "not found" from the provider.
    #[instrument(skip(state))]
    pub async fn delete(state: &AppState, app_id: &str) -> Result<(), FleetError> {
        let conn = state.store.conn()?;
        let Some(mut record) = TunnelRepository::get(&conn, app_id).await? else {
            return Ok(());
        };

        record.is_active = false;
        record.status = TunnelStatus::Deleted;
        TunnelRepository::upsert(&conn, &record).await?;

        let Some(provider) = state.tunnel_provider().await? else {
            return Ok(());
        };

        match provider.list_zones(&record.account_id).await {
            Ok(zones) => {
                for zone_id in zones {
                    if let Err(e) = provider
                        .delete_dns_records_for_tunnel(&zone_id, &record.tunnel_id)
                        .await
                    {
                        tracing::warn!(app_id, zone_id, error = %e, "dns record cleanup failed, continuing");
                    }
                }
            }
            Err(e) => tracing::warn!(app_id, error = %e, "zone enumeration failed, continuing"),
        }
        provider
            .delete_tunnel(&record.account_id, &record.tunnel_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_domain_models::{new_id, IngressRule};
    use fleet_infra_store::Store;

    async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(":memory:", None).await.unwrap();
        let state = AppState::new(
            crate::config::Config {
                node_id: new_id(),
                node_name: "primary".to_string(),
                is_primary: true,
                api_endpoint: "http://127.0.0.1:3000".to_string(),
                node_api_key: new_id(),
                primary_url: None,
                apps_root: dir.path().to_path_buf(),
                database_url: ":memory:".to_string(),
                database_auth_token: None,
                api_token: "dev-token".to_string(),
                port: 3000,
                max_description_len: 2048,
            },
            store,
        );
        (state, dir)
    }

    fn sample_record(app_id: &str) -> TunnelRecord {
        TunnelRecord {
            app_id: app_id.to_string(),
            tunnel_id: "tun-1".to_string(),
            tunnel_name: "uptime-kuma".to_string(),
            tunnel_token: "token".to_string(),
            account_id: "acct-1".to_string(),
            ingress_rules: vec![IngressRule {
                hostname: "uptime.example.com".to_string(),
                path: None,
                service: "http://localhost:3001".to_string(),
                origin_server_name: None,
                no_tls_verify: false,
            }],
            is_active: true,
            status: TunnelStatus::Active,
            last_synced_at: None,
            error_details: None,
        }
    }

    #[tokio::test]
    async fn delete_of_unknown_tunnel_is_a_no_op() {
        let (state, _dir) = test_state().await;
        TunnelService::delete(&state, "no-such-app").await.unwrap();
    }

    #[tokio::test]
    async fn update_ingress_without_a_tunnel_record_is_not_found() {
        let (state, _dir) = test_state().await;
        let err = TunnelService::update_ingress(&state, "no-such-app", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::NotFound(_)));
    }

    #[tokio::test]
    async fn sync_status_without_credentials_is_tunnel_not_configured() {
        let (state, _dir) = test_state().await;
        let conn = state.store.conn().unwrap();
        TunnelRepository::upsert(&conn, &sample_record("app-1")).await.unwrap();

        let err = TunnelService::sync_status(&state, "app-1").await.unwrap_err();
        assert!(matches!(err, FleetError::TunnelNotConfigured));
    }

    #[tokio::test]
    async fn delete_marks_record_inactive_even_without_credentials() {
        let (state, _dir) = test_state().await;
        let conn = state.store.conn().unwrap();
        TunnelRepository::upsert(&conn, &sample_record("app-1")).await.unwrap();

        TunnelService::delete(&state, "app-1").await.unwrap();

        let record = TunnelRepository::get(&conn, "app-1").await.unwrap().unwrap();
        assert!(!record.is_active);
        assert_eq!(record.status, TunnelStatus::Deleted);
    }
}
