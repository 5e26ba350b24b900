// [apps/fleet-node/src/services/lifecycle.rs]
/*!
 * =================================================================
 * APARATO: APP LIFECYCLE SERVICE (ESTRATO L4)
 * CLASIFICACIÓN: DOMAIN SERVICE / STATE MACHINE SOBERANA
 * RESPONSABILIDAD: CREACIÓN, MUTACIÓN Y TERMINACIÓN DE APPS
 *
 * VISION HIPER-HOLÍSTICA:
 * Cada mutación verifica primero si la app pertenece a este nodo; si
 * no, la orden se reenvía al nodo propietario en vez de ejecutarse
 * localmente. La terminación de una app es una tubería de limpieza
 * de mejor esfuerzo: ningún paso individual detiene a los demás.
 * =================================================================
 */

use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, instrument, warn};

use fleet_domain_models::{
    new_id, App, AppStatus, ComposeVersion, CreateAppRequest, FleetError, RollbackRequest, TunnelRecord,
    TunnelStatus, UpdateAppRequest,
};
use fleet_infra_container::ContainerAdapter;
use fleet_infra_store::{AppRepository, ComposeVersionRepository, SettingsRepository, TunnelRepository};
use fleet_infra_tunnel::TunnelProvider;

use crate::dto::{CleanupReport, StepOutcome};
use crate::router::{resolve_target, RouteTarget};
use crate::services::tunnel::TunnelService;
use crate::state::AppState;
use crate::peer;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[a-z0-9][a-z0-9_-]{0,62}$").unwrap())
}

/// The per-app state machine: create, read, update, delete, and the three
/// container-affecting transitions (start/stop/update-containers), plus
/// token repair. Every mutating operation forwards to the owning node when
/// called against a remote app.
pub struct AppLifecycleService;

impl AppLifecycleService {
    #[instrument(skip(state, req))]
    pub async fn create(state: &AppState, req: CreateAppRequest) -> Result<App, FleetError> {
        if let Some(target) = req.target_node.as_deref() {
            if target != state.config.node_id {
                let conn = state.store.conn()?;
                let node = fleet_infra_store::NodeRepository::get(&conn, target)
                    .await?
                    .ok_or_else(|| FleetError::NotFound(format!("node {target}")))?;
                return peer::post(state, &node, "/api/internal/apps", &req).await;
            }
        }

        if !name_pattern().is_match(&req.name) {
            return Err(FleetError::Validation(format!(
                "app name '{}' does not match [a-z0-9][a-z0-9_-]{{0,62}}",
                req.name
            )));
        }
        if req.description.len() > state.config.max_description_len {
            return Err(FleetError::Validation(format!(
                "description exceeds {} characters",
                state.config.max_description_len
            )));
        }
        let mut doc = fleet_compose::parse(&req.compose_content)?;

        let conn = state.store.conn()?;
        let settings = SettingsRepository::get(&conn).await?;

        let mut tunnel_record = None;
        let mut compose_content = req.compose_content.clone();
        let mut tunnel_id = None;
        let mut tunnel_token = None;
        let mut tunnel_domain = None;

        if settings.has_tunnel_credentials() {
            let account_id = settings.cloud_account_id.clone().unwrap();
            let provider = state
                .tunnel_provider()
                .await?
                .ok_or(FleetError::TunnelNotConfigured)?;
            let provisioned = provider.create_tunnel(&account_id, &req.name).await?;

            fleet_compose::inject_sidecar(&mut doc, &req.name, &provisioned.tunnel_token);
            compose_content = fleet_compose::serialize(&doc)?;

            let domain = req.ingress_rules.first().map(|r| r.hostname.clone());
            tunnel_record = Some(TunnelRecord {
                app_id: String::new(), // filled in once the app id is known
                tunnel_id: provisioned.tunnel_id.clone(),
                tunnel_name: req.name.clone(),
                tunnel_token: provisioned.tunnel_token.clone(),
                account_id,
                ingress_rules: req.ingress_rules.clone(),
                is_active: true,
                status: TunnelStatus::Active,
                last_synced_at: None,
                error_details: None,
            });
            tunnel_id = Some(provisioned.tunnel_id);
            tunnel_token = Some(provisioned.tunnel_token);
            tunnel_domain = domain;
        }

        let now = Utc::now();
        let app = App {
            id: new_id(),
            name: req.name.clone(),
            node_id: state.config.node_id.clone(),
            description: req.description.clone(),
            compose_content: compose_content.clone(),
            tunnel_id,
            tunnel_token,
            tunnel_domain,
            public_url: None,
            status: AppStatus::Stopped,
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        AppRepository::insert(&conn, &app).await?;

        let version = ComposeVersion {
            app_id: app.id.clone(),
            version: 1,
            compose_content: compose_content.clone(),
            is_current: true,
            change_reason: Some("Initial version".to_string()),
            changed_by: None,
            rolled_back_from: None,
            created_at: now,
        };
        ComposeVersionRepository::append(&conn, &version).await?;

        if let Err(e) = state.container.create_directory(&app.name).await {
            AppRepository::delete(&conn, &app.id).await.ok();
            return Err(e);
        }
        if let Err(e) = state.container.write_compose(&app.name, &compose_content).await {
            AppRepository::delete(&conn, &app.id).await.ok();
            return Err(e);
        }

        if let Some(mut record) = tunnel_record.take() {
            record.app_id = app.id.clone();
            TunnelRepository::upsert(&conn, &record).await?;
        }

        let mut final_app = app.clone();
        if settings.auto_start_apps {
            match Self::start(state, &final_app.id).await {
                Ok(started) => {
                    final_app = started;
                    if !req.ingress_rules.is_empty() && final_app.tunnel_id.is_some() {
                        if let Err(e) =
                            TunnelService::update_ingress(state, &final_app.id, &req.ingress_rules).await
                        {
                            warn!(app_id = %final_app.id, error = %e, "ingress update after create failed");
                        } else if let Err(e) = state.container.restart_sidecar(&final_app.name).await {
                            warn!(app_id = %final_app.id, error = %e, "sidecar restart after ingress update failed");
                        }
                    }
                }
                Err(e) => {
                    warn!(app_id = %final_app.id, error = %e, "auto-start after create failed");
                    AppRepository::set_status(&conn, &final_app.id, AppStatus::Error, Some(&e.to_string()))
                        .await?;
                    final_app.status = AppStatus::Error;
                    final_app.error_message = Some(e.to_string());
                }
            }
        }

        info!(app_id = %final_app.id, name = %final_app.name, "🛰️ app provisioned and registered in the fleet");
        Ok(final_app)
    }

    pub async fn get(state: &AppState, id: &str) -> Result<App, FleetError> {
        let conn = state.store.conn()?;
        let app = AppRepository::get(&conn, id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("app {id}")))?;

        match resolve_target(state, &app.node_id).await? {
            RouteTarget::Local => Ok(app),
            RouteTarget::Remote(node) => peer::get(state, &node, &format!("/api/internal/apps/{id}")).await,
        }
    }

    #[instrument(skip(state, req))]
    pub async fn update(state: &AppState, id: &str, req: UpdateAppRequest) -> Result<App, FleetError> {
        let conn = state.store.conn()?;
        let mut app = AppRepository::get(&conn, id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("app {id}")))?;

        if let RouteTarget::Remote(node) = resolve_target(state, &app.node_id).await? {
            return peer::post(state, &node, &format!("/api/internal/apps/{id}/edit"), &req).await;
        }

        let lock = state.app_lock(id).await;
        let _guard = lock.lock().await;

        if let Some(name) = req.name {
            app.name = name;
        }
        if let Some(description) = req.description {
            app.description = description;
        }

        let content_changed = if let Some(new_content) = req.compose_content {
            let mut doc = fleet_compose::parse(&new_content)?;
            if app.tunnel_id.is_some() {
                if let Some(token) = app.tunnel_token.clone() {
                    fleet_compose::inject_sidecar(&mut doc, &app.name, &token);
                }
            }
            let rewritten = fleet_compose::serialize(&doc)?;
            let changed = rewritten != app.compose_content;
            app.compose_content = rewritten;
            changed
        } else {
            false
        };

        app.updated_at = Utc::now();
        AppRepository::update(&conn, &app).await?;

        if content_changed {
            let next_version = ComposeVersionRepository::next_version_number(&conn, &app.id).await?;
            let version = ComposeVersion {
                app_id: app.id.clone(),
                version: next_version,
                compose_content: app.compose_content.clone(),
                is_current: true,
                change_reason: Some("Compose file updated".to_string()),
                changed_by: None,
                rolled_back_from: None,
                created_at: app.updated_at,
            };
            ComposeVersionRepository::append(&conn, &version).await?;
            state.container.write_compose(&app.name, &app.compose_content).await?;
        }

        Ok(app)
    }

    /// Appends a new current version whose content equals `target_version`'s,
    /// recording it as a rollback. Prior rows are never mutated.
    #[instrument(skip(state, req))]
    pub async fn rollback(
        state: &AppState,
        id: &str,
        target_version: i64,
        req: RollbackRequest,
    ) -> Result<App, FleetError> {
        let conn = state.store.conn()?;
        let mut app = AppRepository::get(&conn, id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("app {id}")))?;

        if let RouteTarget::Remote(node) = resolve_target(state, &app.node_id).await? {
            return peer::post(
                state,
                &node,
                &format!("/api/internal/apps/{id}/compose/rollback/{target_version}"),
                &req,
            )
            .await;
        }

        let lock = state.app_lock(id).await;
        let _guard = lock.lock().await;

        let target = ComposeVersionRepository::get(&conn, id, target_version)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("version {target_version} of app {id}")))?;
        let current = ComposeVersionRepository::get_current(&conn, id).await?;

        let next_version = ComposeVersionRepository::next_version_number(&conn, id).await?;
        let version = ComposeVersion {
            app_id: id.to_string(),
            version: next_version,
            compose_content: target.compose_content.clone(),
            is_current: true,
            change_reason: req.change_reason,
            changed_by: req.changed_by,
            rolled_back_from: current.map(|c| c.version),
            created_at: Utc::now(),
        };
        ComposeVersionRepository::append(&conn, &version).await?;

        app.compose_content = target.compose_content;
        app.updated_at = Utc::now();
        AppRepository::update(&conn, &app).await?;
        state.container.write_compose(&app.name, &app.compose_content).await?;

        Ok(app)
    }

    #[instrument(skip(state))]
    pub async fn delete(state: &AppState, id: &str) -> Result<CleanupReport, FleetError> {
        let conn = state.store.conn()?;
        let Some(app) = AppRepository::get(&conn, id).await? else {
            return Ok(CleanupReport::default());
        };

        if let RouteTarget::Remote(node) = resolve_target(state, &app.node_id).await? {
            return peer::post(state, &node, &format!("/api/internal/apps/{id}/delete"), &()).await;
        }

        let lock = state.app_lock(id).await;
        let _guard = lock.lock().await;

        let mut report = CleanupReport::default();
        run_step(&mut report, "stop_containers", state.container.down(&app.name)).await;
        run_step(
            &mut report,
            "remove_sidecar_container",
            state.container.remove_sidecar(&app.name),
        )
        .await;

        if app.tunnel_id.is_some() {
            run_step(&mut report, "delete_dns_and_tunnel", TunnelService::delete(state, &app.id)).await;
        } else {
            report.steps.push(StepOutcome {
                step: "delete_dns_and_tunnel".to_string(),
                success: true,
                duration_ms: 0,
                error: None,
            });
        }

        run_step(&mut report, "remove_working_directory", state.container.delete_directory(&app.name)).await;

        // `ON DELETE CASCADE` in the schema documents the relationship but
        // isn't enforced: libSQL/SQLite leaves FK enforcement off unless a
        // connection explicitly opts in, and every `Store::conn()` call
        // hands back a fresh one. Remove dependent rows ourselves so
        // `compose_versions`/`tunnels` never outlive the app they belong to.
        run_step(&mut report, "delete_compose_versions", async {
            ComposeVersionRepository::delete_for_app(&conn, &app.id).await
        })
        .await;
        run_step(&mut report, "delete_tunnel_record", async {
            TunnelRepository::delete(&conn, &app.id).await
        })
        .await;
        run_step(&mut report, "delete_app_row", async {
            AppRepository::delete(&conn, &app.id).await
        })
        .await;

        info!(app_id = %app.id, success = report.success(), "⚓ app teardown pipeline finished");
        Ok(report)
    }

    #[instrument(skip(state))]
    pub async fn start(state: &AppState, id: &str) -> Result<App, FleetError> {
        Self::run_container_transition(state, id, AppStatus::Running, |adapter, name| {
            Box::pin(async move { adapter.up(name).await })
        })
        .await
    }

    #[instrument(skip(state))]
    pub async fn stop(state: &AppState, id: &str) -> Result<App, FleetError> {
        Self::run_container_transition(state, id, AppStatus::Stopped, |adapter, name| {
            Box::pin(async move { adapter.down(name).await })
        })
        .await
    }

    #[instrument(skip(state))]
    pub async fn update_containers(state: &AppState, id: &str) -> Result<App, FleetError> {
        let conn = state.store.conn()?;
        let app = AppRepository::get(&conn, id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("app {id}")))?;
        if let RouteTarget::Remote(node) = resolve_target(state, &app.node_id).await? {
            return peer::post(state, &node, &format!("/api/internal/apps/{id}/update-containers"), &()).await;
        }

        let lock = state.app_lock(id).await;
        let _guard = lock.lock().await;

        AppRepository::set_status(&conn, id, AppStatus::Updating, None).await?;
        match state.container.update(&app.name).await {
            Ok(()) => {
                AppRepository::set_status(&conn, id, AppStatus::Running, None).await?;
            }
            Err(e) => {
                AppRepository::set_status(&conn, id, AppStatus::Error, Some(&e.to_string())).await?;
                return Err(e);
            }
        }
        AppRepository::get(&conn, id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("app {id}")))
    }

    /// Fetches the cloud provider token for an app that has a `tunnel_id`
    /// but no locally cached `tunnel_token`, re-injects the sidecar, and
    /// rewrites the on-disk compose document.
    #[instrument(skip(state))]
    pub async fn repair(state: &AppState, id: &str) -> Result<App, FleetError> {
        let conn = state.store.conn()?;
        let mut app = AppRepository::get(&conn, id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("app {id}")))?;

        if let RouteTarget::Remote(node) = resolve_target(state, &app.node_id).await? {
            return peer::post(state, &node, &format!("/api/internal/apps/{id}/repair"), &()).await;
        }

        let Some(tunnel_id) = app.tunnel_id.clone() else {
            return Ok(app);
        };
        if app.tunnel_token.is_some() {
            return Ok(app);
        }

        let tunnel = TunnelRepository::get(&conn, &app.id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("tunnel for app {id}")))?;
        let provider = state
            .tunnel_provider()
            .await?
            .ok_or(FleetError::TunnelNotConfigured)?;
        let token = provider.get_tunnel_token(&tunnel.account_id, &tunnel_id).await?;

        let mut doc = fleet_compose::parse(&app.compose_content)?;
        fleet_compose::inject_sidecar(&mut doc, &app.name, &token);
        app.compose_content = fleet_compose::serialize(&doc)?;
        app.tunnel_token = Some(token.clone());
        app.updated_at = Utc::now();
        AppRepository::update(&conn, &app).await?;

        let mut tunnel = tunnel;
        tunnel.tunnel_token = token;
        TunnelRepository::upsert(&conn, &tunnel).await?;

        state.container.write_compose(&app.name, &app.compose_content).await?;
        Ok(app)
    }

    async fn run_container_transition<F>(
        state: &AppState,
        id: &str,
        success_status: AppStatus,
        op: F,
    ) -> Result<App, FleetError>
    where
        F: for<'a> FnOnce(
            &'a std::sync::Arc<dyn fleet_infra_container::ContainerAdapter>,
            &'a str,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), FleetError>> + Send + 'a>>,
    {
        let conn = state.store.conn()?;
        let app = AppRepository::get(&conn, id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("app {id}")))?;
        if let RouteTarget::Remote(node) = resolve_target(state, &app.node_id).await? {
            let path = if success_status == AppStatus::Running {
                format!("/api/internal/apps/{id}/start")
            } else {
                format!("/api/internal/apps/{id}/stop")
            };
            return peer::post(state, &node, &path, &()).await;
        }

        let lock = state.app_lock(id).await;
        let _guard = lock.lock().await;

        match op(&state.container, &app.name).await {
            Ok(()) => {
                AppRepository::set_status(&conn, id, success_status, None).await?;
            }
            Err(e) => {
                AppRepository::set_status(&conn, id, AppStatus::Error, Some(&e.to_string())).await?;
                return Err(e);
            }
        }
        AppRepository::get(&conn, id)
            .await?
            .ok_or_else(|| FleetError::NotFound(format!("app {id}")))
    }
}

async fn run_step<F>(report: &mut CleanupReport, name: &str, op: F)
where
    F: std::future::Future<Output = Result<(), FleetError>>,
{
    let started = std::time::Instant::now();
    let result = op.await;
    let duration_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(()) => report.steps.push(StepOutcome {
            step: name.to_string(),
            success: true,
            duration_ms,
            error: None,
        }),
        Err(e) => {
            warn!(step = name, error = %e, "cleanup step failed, continuing");
            report.steps.push(StepOutcome {
                step: name.to_string(),
                success: false,
                duration_ms,
                error: Some(e.to_string()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_infra_store::Store;

    fn test_config(apps_root: std::path::PathBuf) -> crate::config::Config {
        crate::config::Config {
            node_id: new_id(),
            node_name: "primary".to_string(),
            is_primary: true,
            api_endpoint: "http://127.0.0.1:3000".to_string(),
            node_api_key: new_id(),
            primary_url: None,
            apps_root,
            database_url: ":memory:".to_string(),
            database_auth_token: None,
            api_token: "dev-token".to_string(),
            port: 3000,
            max_description_len: 2048,
        }
    }

    async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::connect(":memory:", None).await.unwrap();
        let state = AppState::new(test_config(dir.path().to_path_buf()), store);
        (state, dir)
    }

    fn create_request(name: &str) -> CreateAppRequest {
        CreateAppRequest {
            name: name.to_string(),
            description: "test app".to_string(),
            compose_content: "services:\n  web:\n    image: nginx\n".to_string(),
            ingress_rules: Vec::new(),
            target_node: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_invalid_names() {
        let (state, _dir) = test_state().await;
        let mut req = create_request("Not Valid!");
        req.name = "Not Valid!".to_string();
        let err = AppLifecycleService::create(&state, req).await.unwrap_err();
        assert!(matches!(err, FleetError::Validation(_)));
    }

    #[tokio::test]
    async fn create_persists_app_and_initial_version() {
        let (state, _dir) = test_state().await;
        let app = AppLifecycleService::create(&state, create_request("uptime-kuma"))
            .await
            .unwrap();

        assert_eq!(app.status, AppStatus::Stopped);
        assert_eq!(app.node_id, state.config.node_id);

        let conn = state.store.conn().unwrap();
        let versions = ComposeVersionRepository::list(&conn, &app.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert!(versions[0].is_current);
    }

    #[tokio::test]
    async fn update_bumps_version_only_when_compose_content_changes() {
        let (state, _dir) = test_state().await;
        let app = AppLifecycleService::create(&state, create_request("uptime-kuma"))
            .await
            .unwrap();

        let renamed = AppLifecycleService::update(
            &state,
            &app.id,
            UpdateAppRequest {
                description: Some("renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.description, "renamed");

        let conn = state.store.conn().unwrap();
        assert_eq!(ComposeVersionRepository::list(&conn, &app.id).await.unwrap().len(), 1);

        let new_content = "services:\n  web:\n    image: nginx:1.27\n".to_string();
        let updated = AppLifecycleService::update(
            &state,
            &app.id,
            UpdateAppRequest {
                compose_content: Some(new_content.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.compose_content, new_content);
        assert_eq!(ComposeVersionRepository::list(&conn, &app.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rollback_appends_a_new_version_instead_of_mutating_history() {
        let (state, _dir) = test_state().await;
        let app = AppLifecycleService::create(&state, create_request("uptime-kuma"))
            .await
            .unwrap();
        AppLifecycleService::update(
            &state,
            &app.id,
            UpdateAppRequest {
                compose_content: Some("services:\n  web:\n    image: nginx:1.27\n".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let rolled_back = AppLifecycleService::rollback(
            &state,
            &app.id,
            1,
            RollbackRequest {
                change_reason: Some("bad image".to_string()),
                changed_by: None,
            },
        )
        .await
        .unwrap();
        assert!(rolled_back.compose_content.contains("image: nginx\n"));

        let conn = state.store.conn().unwrap();
        let versions = ComposeVersionRepository::list(&conn, &app.id).await.unwrap();
        assert_eq!(versions.len(), 3);
        let current = ComposeVersionRepository::get_current(&conn, &app.id).await.unwrap().unwrap();
        assert_eq!(current.rolled_back_from, Some(2));
    }

    #[tokio::test]
    async fn delete_removes_the_app_row_even_when_no_tunnel_is_configured() {
        let (state, _dir) = test_state().await;
        let app = AppLifecycleService::create(&state, create_request("uptime-kuma"))
            .await
            .unwrap();

        let report = AppLifecycleService::delete(&state, &app.id).await.unwrap();
        assert!(report.success());

        let conn = state.store.conn().unwrap();
        assert!(AppRepository::get(&conn, &app.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_also_removes_compose_versions_and_tunnel_row() {
        let (state, _dir) = test_state().await;
        let app = AppLifecycleService::create(&state, create_request("uptime-kuma"))
            .await
            .unwrap();
        let conn = state.store.conn().unwrap();
        fleet_infra_store::TunnelRepository::upsert(
            &conn,
            &TunnelRecord {
                app_id: app.id.clone(),
                tunnel_id: "tun-1".to_string(),
                tunnel_name: app.name.clone(),
                tunnel_token: "token".to_string(),
                account_id: "acct-1".to_string(),
                ingress_rules: Vec::new(),
                is_active: true,
                status: TunnelStatus::Active,
                last_synced_at: None,
                error_details: None,
            },
        )
        .await
        .unwrap();

        AppLifecycleService::delete(&state, &app.id).await.unwrap();

        assert!(ComposeVersionRepository::list(&conn, &app.id).await.unwrap().is_empty());
        assert!(fleet_infra_store::TunnelRepository::get(&conn, &app.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn delete_of_unknown_app_is_a_no_op() {
        let (state, _dir) = test_state().await;
        let report = AppLifecycleService::delete(&state, "does-not-exist").await.unwrap();
        assert!(report.steps.is_empty());
    }

    #[tokio::test]
    async fn get_returns_not_found_for_unknown_app() {
        let (state, _dir) = test_state().await;
        let err = AppLifecycleService::get(&state, "does-not-exist").await.unwrap_err();
        assert!(matches!(err, FleetError::NotFound(_)));
    }
}
