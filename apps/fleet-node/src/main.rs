// [apps/fleet-node/src/main.rs]
/*!
 * =================================================================
 * APARATO: FLEET NODE MAIN ENTRY POINT (V1.0 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * Cada nodo del enjambre es soberano: lee su propia configuración de
 * entorno, se auto-registra en el padrón de nodos y levanta su propio
 * servidor HTTP antes de anunciarse al resto de la flota.
 * =================================================================
 */

mod aggregator;
mod config;
mod dto;
mod error_response;
mod handlers;
mod health;
mod kernel;
mod middleware;
mod peer;
mod router;
mod routes;
mod services;
mod state;

use config::Config;
use kernel::Kernel;

/// Punto de ignición del binario de nodo.
fn main() {
    dotenvy::dotenv().ok();
    fleet_shared_telemetry::init_tracing("fleet_node");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    runtime.block_on(async {
        let config = Config::from_env();
        let kernel = Kernel::ignite(config).await;
        kernel.launch().await;
    });
}
