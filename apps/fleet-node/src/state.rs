// [apps/fleet-node/src/state.rs]
/*!
 * =================================================================
 * APARATO: SHARED APPLICATION STATE (ESTRATO L2)
 * CLASIFICACIÓN: NUCLEO COMPARTIDO / SYSTEM NERVE CENTER
 * RESPONSABILIDAD: DISTRIBUCIÓN DE ADAPTADORES Y BLOQUEOS POR APP
 *
 * Un solo `AppState`, clonado barato hacia cada handler y tarea de
 * fondo. Los candados por app viven aquí para que ninguna mutación
 * de contenedores o disco colisione con otra sobre el mismo recurso.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use fleet_infra_container::{ComposeContainerAdapter, ContainerAdapter};
use fleet_infra_store::Store;
use fleet_infra_tunnel::{CloudflareTunnelProvider, TunnelProvider};

use crate::config::Config;

/// Shared, cloneable application state: every handler and background task
/// gets a copy of the `Arc`s inside, never the state itself.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    pub container: Arc<dyn ContainerAdapter>,
    pub http: reqwest::Client,
    /// One lock per app id, serializing container-CLI and disk writes for
    /// that app without blocking operations on other apps.
    app_locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        let container = ComposeContainerAdapter::new(config.apps_root.clone());
        Self {
            config: Arc::new(config),
            store,
            container: Arc::new(container),
            http: reqwest::Client::new(),
            app_locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Builds a tunnel provider from the currently configured settings, or
    /// `None` if no cloud credentials are on file.
    pub async fn tunnel_provider(&self) -> Result<Option<Arc<dyn TunnelProvider>>, fleet_domain_models::FleetError> {
        let conn = self.store.conn()?;
        let settings = fleet_infra_store::SettingsRepository::get(&conn).await?;
        Ok(settings
            .cloud_api_token
            .map(|token| Arc::new(CloudflareTunnelProvider::new(token)) as Arc<dyn TunnelProvider>))
    }

    /// Returns the per-app lock, creating it on first use.
    pub async fn app_lock(&self, app_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.app_locks.read().await.get(app_id) {
            return lock.clone();
        }
        let mut locks = self.app_locks.write().await;
        locks
            .entry(app_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
