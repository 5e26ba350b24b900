// [apps/fleet-node/src/aggregator.rs]
/*!
 * =================================================================
 * APARATO: AGREGADOR DE VISIÓN DE FLOTA (ESTRATO L3)
 * CLASIFICACIÓN: FAN-OUT SERVICE
 * RESPONSABILIDAD: CONSOLIDACIÓN DE ESTADO ENTRE NODOS
 *
 * Reúne el estado local y el de cada peer en paralelo; un peer que
 * no responde no bloquea la vista agregada del resto del enjambre.
 * =================================================================
 */

use futures::future::join_all;
use tracing::warn;

use fleet_domain_models::{App, FleetError, Node};
use fleet_infra_store::{AppRepository, NodeRepository};

use crate::dto::{NodeContainerStats, NodeSystemStats};
use crate::router::is_local;
use crate::services::stats::StatsService;
use crate::state::AppState;
use crate::{dto, peer};

/// Resolves the `node_id` query parameter set to the concrete list of nodes
/// a fan-out read should target. Empty or `["all"]` means every registered
/// node; anything else is taken literally.
pub async fn determine_targets(state: &AppState, node_ids: &[String]) -> Result<Vec<Node>, FleetError> {
    let conn = state.store.conn()?;
    let wants_all = node_ids.is_empty() || node_ids.iter().any(|id| id == "all");
    if wants_all {
        return NodeRepository::list_all(&conn).await;
    }
    let mut nodes = Vec::with_capacity(node_ids.len());
    for id in node_ids {
        if let Some(node) = NodeRepository::get(&conn, id).await? {
            nodes.push(node);
        }
    }
    Ok(nodes)
}

/// Fans out `GET /api/apps` across `targets`, one worker per node. A worker
/// failure is logged and dropped; the partial result set is still returned
/// as success.
pub async fn aggregate_apps(state: &AppState, targets: &[Node]) -> Result<Vec<App>, FleetError> {
    let workers = targets.iter().map(|node| fetch_apps(state, node));
    let results = join_all(workers).await;

    let mut apps = Vec::new();
    for result in results {
        match result {
            Ok(mut node_apps) => apps.append(&mut node_apps),
            Err(e) => warn!(error = %e, "node dropped from apps fan-out"),
        }
    }
    Ok(apps)
}

async fn fetch_apps(state: &AppState, node: &Node) -> Result<Vec<App>, FleetError> {
    if is_local(state, &node.id) {
        let conn = state.store.conn()?;
        return AppRepository::list_by_node(&conn, &state.config.node_id).await;
    }
    peer::get::<Vec<App>>(state, node, "/api/internal/apps").await
}

/// Fans out host-level stats across `targets`.
pub async fn aggregate_system_stats(
    state: &AppState,
    targets: &[Node],
) -> Result<Vec<NodeSystemStats>, FleetError> {
    let workers = targets.iter().map(|node| fetch_system_stats(state, node));
    let results = join_all(workers).await;

    let mut stats = Vec::new();
    for result in results {
        match result {
            Ok(node_stats) => stats.push(node_stats),
            Err(e) => warn!(error = %e, "node dropped from system stats fan-out"),
        }
    }
    Ok(stats)
}

async fn fetch_system_stats(state: &AppState, node: &Node) -> Result<NodeSystemStats, FleetError> {
    if is_local(state, &node.id) {
        return Ok(NodeSystemStats {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            system: StatsService::system_stats(),
        });
    }
    peer::get::<dto::SystemStats>(state, node, "/api/internal/system/stats")
        .await
        .map(|system| NodeSystemStats {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            system,
        })
}

/// Fans out per-container stats across `targets`.
pub async fn aggregate_container_stats(
    state: &AppState,
    targets: &[Node],
) -> Result<Vec<NodeContainerStats>, FleetError> {
    let workers = targets.iter().map(|node| fetch_container_stats(state, node));
    let results = join_all(workers).await;

    let mut stats = Vec::new();
    for result in results {
        match result {
            Ok(node_stats) => stats.push(node_stats),
            Err(e) => warn!(error = %e, "node dropped from container stats fan-out"),
        }
    }
    Ok(stats)
}

async fn fetch_container_stats(state: &AppState, node: &Node) -> Result<NodeContainerStats, FleetError> {
    if is_local(state, &node.id) {
        let containers = StatsService::container_stats(state).await?;
        return Ok(NodeContainerStats {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            containers,
        });
    }
    peer::get::<Vec<fleet_infra_container::ContainerStats>>(
        state,
        node,
        "/api/internal/containers/stats",
    )
    .await
    .map(|containers| NodeContainerStats {
        node_id: node.id.clone(),
        node_name: node.name.clone(),
        containers,
    })
}
