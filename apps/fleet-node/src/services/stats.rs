use sysinfo::{Disks, System};

use fleet_domain_models::{App, FleetError};
use fleet_infra_container::{ContainerAdapter, ContainerStats};
use fleet_infra_store::AppRepository;

use crate::dto::SystemStats;
use crate::state::AppState;

/// Collects host-level CPU/memory/disk usage plus per-app container stats.
/// Every adapter call is local; fleet-wide aggregation happens one layer up
/// in the aggregator.
pub struct StatsService;

impl StatsService {
    pub fn system_stats() -> SystemStats {
        let mut system = System::new_all();
        system.refresh_cpu_usage();
        system.refresh_memory();
        let cpu_percent = system.global_cpu_usage() as f64;

        let disks = Disks::new_with_refreshed_list();
        let (disk_used, disk_total) = disks
            .iter()
            .fold((0u64, 0u64), |(used, total), disk| {
                let disk_total_space = disk.total_space();
                let disk_available = disk.available_space();
                (
                    used + disk_total_space.saturating_sub(disk_available),
                    total + disk_total_space,
                )
            });

        SystemStats {
            cpu_percent,
            memory_used_bytes: system.used_memory(),
            memory_total_bytes: system.total_memory(),
            disk_used_bytes: disk_used,
            disk_total_bytes: disk_total,
        }
    }

    pub async fn container_stats(state: &AppState) -> Result<Vec<ContainerStats>, FleetError> {
        let conn = state.store.conn()?;
        let apps: Vec<App> = AppRepository::list_by_node(&conn, &state.config.node_id).await?;
        let mut stats = Vec::new();
        for app in apps {
            match state.container.stats(&app.name).await {
                Ok(mut app_stats) => stats.append(&mut app_stats),
                Err(e) => {
                    tracing::warn!(app_id = %app.id, error = %e, "failed to collect container stats");
                }
            }
        }
        Ok(stats)
    }

    pub async fn restart_container(state: &AppState, container_id: &str) -> Result<(), FleetError> {
        state.container.restart_container(container_id).await
    }

    pub async fn stop_container(state: &AppState, container_id: &str) -> Result<(), FleetError> {
        state.container.stop_container(container_id).await
    }

    pub async fn remove_container(state: &AppState, container_id: &str) -> Result<(), FleetError> {
        state.container.remove_container(container_id).await
    }
}
