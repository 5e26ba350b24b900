// [apps/fleet-node/src/health.rs]
/*!
 * =================================================================
 * APARATO: VIGÍA DE SALUD DE LA FLOTA (ESTRATO L3)
 * CLASIFICACIÓN: BACKGROUND SERVICE / RESURRECCIÓN DE NODOS
 * RESPONSABILIDAD: DETECCIÓN DE CAÍDAS Y REINTENTOS CON BACKOFF
 *
 * Solo el nodo primario vigila al resto del enjambre. Cada peer se
 * sondea respetando una ventana de backoff creciente según su racha
 * de fallos, para no inundar a un nodo ya caído con reintentos.
 * =================================================================
 */

use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use fleet_domain_models::{FleetError, Node, NodeStatus};
use fleet_infra_store::NodeRepository;

use crate::dto::SystemStats;
use crate::peer;
use crate::state::AppState;

const CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Minimum interval since the last probe before a node is due for another
/// one, keyed by its current consecutive-failure count.
fn backoff_window(consecutive_failures: i64) -> chrono::Duration {
    match consecutive_failures {
        0..=2 => chrono::Duration::zero(),
        3..=5 => chrono::Duration::minutes(2),
        6..=9 => chrono::Duration::minutes(5),
        _ => chrono::Duration::minutes(15),
    }
}

/// True if enough time has passed since `node`'s last health check for it to
/// be probed again, given its current failure count.
pub fn should_check(node: &Node, now: chrono::DateTime<Utc>) -> bool {
    let window = backoff_window(node.consecutive_failures);
    match node.last_health_check {
        None => true,
        Some(last) => now - last >= window,
    }
}

fn status_for_failures(consecutive_failures: i64) -> NodeStatus {
    if consecutive_failures >= 10 {
        NodeStatus::Unreachable
    } else if consecutive_failures >= 3 {
        NodeStatus::Offline
    } else {
        NodeStatus::Online
    }
}

/// Spawns the primary's background health-check loop. A no-op on
/// secondaries: only the primary owns the fleet-wide view of node health.
pub fn spawn(state: AppState) {
    if !state.config.is_primary {
        return;
    }
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CHECK_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = run_once(&state).await {
                warn!(error = %e, "health check pass failed");
            }
        }
    });
}

/// One pass over every registered node: marks self online, probes whichever
/// peers are due per their backoff window.
#[instrument(skip(state))]
pub async fn run_once(state: &AppState) -> Result<(), FleetError> {
    let conn = state.store.conn()?;
    let nodes = NodeRepository::list_all(&conn).await?;

    for node in nodes {
        if node.id == state.config.node_id {
            NodeRepository::record_heartbeat(&conn, &node.id, true, NodeStatus::Online).await?;
            continue;
        }
        if !should_check(&node, Utc::now()) {
            continue;
        }
        probe(state, &node).await;
    }
    Ok(())
}

/// Probes a single peer's stats endpoint and records the observation,
/// bypassing the backoff window. Used by the manual-check route.
pub async fn manual_check(state: &AppState, node: &Node) -> Result<(), FleetError> {
    probe(state, node).await;
    Ok(())
}

async fn probe(state: &AppState, node: &Node) {
    let conn = match state.store.conn() {
        Ok(conn) => conn,
        Err(e) => {
            warn!(node_id = %node.id, error = %e, "could not open store connection for health probe");
            return;
        }
    };

    let result = peer::get::<SystemStats>(state, node, "/api/internal/system/stats").await;
    match result {
        Ok(_) => {
            info!(node_id = %node.id, "🧬 health probe succeeded, node resurrected");
            if let Err(e) =
                NodeRepository::record_heartbeat(&conn, &node.id, true, NodeStatus::Online).await
            {
                warn!(node_id = %node.id, error = %e, "failed to record successful probe");
            }
        }
        Err(e) => {
            warn!(node_id = %node.id, error = %e, "❌ health probe failed");
            let status = status_for_failures(node.consecutive_failures + 1);
            if let Err(e) =
                NodeRepository::record_heartbeat(&conn, &node.id, false, status).await
            {
                warn!(node_id = %node.id, error = %e, "failed to record failed probe");
            }
        }
    }
}

/// Handles a worker's heartbeat: resets its failure state immediately,
/// the fastest path to `online`.
pub async fn record_heartbeat(state: &AppState, node_id: &str) -> Result<(), FleetError> {
    let conn = state.store.conn()?;
    NodeRepository::record_heartbeat(&conn, node_id, true, NodeStatus::Online).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_with(consecutive_failures: i64, last_health_check: Option<chrono::DateTime<Utc>>) -> Node {
        Node {
            id: "n1".into(),
            name: "secondary".into(),
            api_endpoint: "http://secondary:3000".into(),
            api_key: "key".into(),
            is_primary: false,
            status: NodeStatus::Online,
            last_seen: None,
            last_health_check,
            consecutive_failures,
        }
    }

    #[test]
    fn never_checked_is_always_due() {
        assert!(should_check(&node_with(0, None), Utc::now()));
    }

    #[test]
    fn low_failure_count_is_always_due() {
        let node = node_with(1, Some(Utc::now()));
        assert!(should_check(&node, Utc::now()));
    }

    #[test]
    fn mid_failure_count_respects_two_minute_window() {
        let now = Utc::now();
        let node = node_with(4, Some(now - chrono::Duration::seconds(30)));
        assert!(!should_check(&node, now));
        assert!(should_check(&node, now + chrono::Duration::minutes(3)));
    }

    #[test]
    fn high_failure_count_respects_fifteen_minute_window() {
        let now = Utc::now();
        let node = node_with(12, Some(now - chrono::Duration::minutes(10)));
        assert!(!should_check(&node, now));
        assert!(should_check(&node, now + chrono::Duration::minutes(10)));
    }

    #[test]
    fn status_thresholds_match_specification() {
        assert_eq!(status_for_failures(0), NodeStatus::Online);
        assert_eq!(status_for_failures(2), NodeStatus::Online);
        assert_eq!(status_for_failures(3), NodeStatus::Offline);
        assert_eq!(status_for_failures(9), NodeStatus::Offline);
        assert_eq!(status_for_failures(10), NodeStatus::Unreachable);
    }
}
