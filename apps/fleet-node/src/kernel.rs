// [apps/fleet-node/src/kernel.rs]
/*!
 * =================================================================
 * APARATO: FLEET NODE SOVEREIGN KERNEL (V1.0 - GUARD ACTIVE)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * Actúa como la placa base donde se conectan el almacén de persistencia,
 * el padrón de nodos y el servidor HTTP. La ignición es determinista:
 * primero se cristaliza la conexión a la base de datos, luego se
 * garantiza la auto-inscripción del nodo, y solo entonces se abre el
 * socket de escucha.
 * =================================================================
 */

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tracing::{error, info, instrument};

use fleet_domain_models::{Node, NodeStatus};
use fleet_infra_store::{NodeRepository, Store};

use crate::config::Config;
use crate::health;
use crate::routes;
use crate::state::AppState;

/// Composition root: owns the database handle and server port, and knows
/// how to turn them into a running process.
pub struct Kernel {
    port: u16,
    state: AppState,
}

impl Kernel {
    /// Realiza la ignición del almacén de persistencia y el estado
    /// compartido. Aborta el proceso si la base de datos no responde:
    /// no existe un modo degradado sin persistencia.
    #[instrument(skip(config))]
    pub async fn ignite(config: Config) -> Self {
        let store = Store::connect(&config.database_url, config.database_auth_token.clone())
            .await
            .expect("database connection failed, aborting startup");

        let port = config.port;
        let state = AppState::new(config, store);
        Self::ensure_self_registered(&state)
            .await
            .expect("failed to register this node in the node registry");

        info!(node_id = %state.config.node_id, "🧬 node identity hydrated from local registry");

        Self { port, state }
    }

    /// Inserts a row for this node on first boot, so the registry always
    /// knows about the node it's running on even before any peer is added.
    async fn ensure_self_registered(state: &AppState) -> Result<(), fleet_domain_models::FleetError> {
        let conn = state.store.conn()?;
        if NodeRepository::get(&conn, &state.config.node_id).await?.is_some() {
            return Ok(());
        }
        let node = Node {
            id: state.config.node_id.clone(),
            name: state.config.node_name.clone(),
            api_endpoint: state.config.api_endpoint.clone(),
            api_key: state.config.node_api_key.clone(),
            is_primary: state.config.is_primary,
            status: NodeStatus::Online,
            last_seen: None,
            last_health_check: None,
            consecutive_failures: 0,
        };
        NodeRepository::insert(&conn, &node).await
    }

    /// Lanza el vigía de salud en segundo plano y sirve la API HTTP hasta
    /// que el proceso sea terminado.
    pub async fn launch(self) {
        health::spawn(self.state.clone());

        let router = routes::build(self.state);
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port);

        info!(%addr, "🚀 fleet-node listening, swarm ignition complete");
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("failed to bind listening port");

        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "❌ server exited with error");
            std::process::exit(1);
        }
    }
}
