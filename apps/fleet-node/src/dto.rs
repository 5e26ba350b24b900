use serde::{Deserialize, Serialize};

use fleet_infra_container::ContainerStats;

/// Host-level resource snapshot, collected locally and fanned out to peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub cpu_percent: f64,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub disk_used_bytes: u64,
    pub disk_total_bytes: u64,
}

/// One node's contribution to a fleet-aggregated stats read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSystemStats {
    pub node_id: String,
    pub node_name: String,
    pub system: SystemStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeContainerStats {
    pub node_id: String,
    pub node_name: String,
    pub containers: Vec<ContainerStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// The cleanup pipeline's aggregated, non-short-circuiting outcome.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CleanupReport {
    pub steps: Vec<StepOutcome>,
}

impl CleanupReport {
    pub fn success(&self) -> bool {
        self.steps.iter().all(|s| s.success)
    }
}

/// Shared query shape for the fleet-wide read endpoints. `node_id` is
/// comma-separated since a bare repeated query key needs an extractor this
/// workspace doesn't otherwise depend on; `"all"` or an empty value means
/// every node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeIdQuery {
    pub node_id: Option<String>,
}

impl NodeIdQuery {
    pub fn targets(&self) -> Vec<String> {
        match &self.node_id {
            None => Vec::new(),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_log_tail")]
    pub tail: usize,
}

fn default_log_tail() -> usize {
    200
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
