use serde::{Deserialize, Serialize};

use fleet_domain_models::FleetError;

/// One container's resource snapshot, as reported by `docker stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerStats {
    pub container_id: String,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_usage_bytes: u64,
    pub memory_limit_bytes: u64,
    pub net_rx_bytes: u64,
    pub net_tx_bytes: u64,
    pub block_read_bytes: u64,
    pub block_write_bytes: u64,
}

#[derive(Debug, Deserialize)]
struct DockerStatsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "CPUPerc")]
    cpu_perc: String,
    #[serde(rename = "MemUsage")]
    mem_usage: String,
    #[serde(rename = "NetIO")]
    net_io: String,
    #[serde(rename = "BlockIO")]
    block_io: String,
}

/// Parses `docker stats --format json`'s newline-delimited JSON output.
pub fn parse_docker_stats(raw: &str) -> Result<Vec<ContainerStats>, FleetError> {
    let mut stats = Vec::new();
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        let parsed: DockerStatsLine = serde_json::from_str(line)
            .map_err(|e| FleetError::ContainerOperationFailed(format!("parse stats: {e}")))?;
        let (mem_usage, mem_limit) = split_pair(&parsed.mem_usage, "/");
        let (net_rx, net_tx) = split_pair(&parsed.net_io, "/");
        let (block_read, block_write) = split_pair(&parsed.block_io, "/");
        stats.push(ContainerStats {
            container_id: parsed.id,
            name: parsed.name,
            cpu_percent: parsed.cpu_perc.trim_end_matches('%').parse().unwrap_or(0.0),
            memory_usage_bytes: parse_byte_size(&mem_usage),
            memory_limit_bytes: parse_byte_size(&mem_limit),
            net_rx_bytes: parse_byte_size(&net_rx),
            net_tx_bytes: parse_byte_size(&net_tx),
            block_read_bytes: parse_byte_size(&block_read),
            block_write_bytes: parse_byte_size(&block_write),
        });
    }
    Ok(stats)
}

fn split_pair(s: &str, sep: &str) -> (String, String) {
    match s.split_once(sep) {
        Some((a, b)) => (a.trim().to_string(), b.trim().to_string()),
        None => (s.trim().to_string(), String::new()),
    }
}

/// Parses a docker-formatted size like `12.3MiB` or `512B` into bytes.
fn parse_byte_size(s: &str) -> u64 {
    let s = s.trim();
    let split_at = s.find(|c: char| !c.is_ascii_digit() && c != '.');
    let Some(split_at) = split_at else {
        return s.parse().unwrap_or(0);
    };
    let (number, unit) = s.split_at(split_at);
    let number: f64 = number.parse().unwrap_or(0.0);
    let multiplier = match unit.trim() {
        "B" => 1.0,
        "kB" | "KB" => 1_000.0,
        "KiB" => 1_024.0,
        "MB" => 1_000_000.0,
        "MiB" => 1_024.0 * 1_024.0,
        "GB" => 1_000_000_000.0,
        "GiB" => 1_024.0 * 1_024.0 * 1_024.0,
        _ => 1.0,
    };
    (number * multiplier) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_stats_line() {
        let raw = r#"{"ID":"abc123","Name":"web","CPUPerc":"1.23%","MemUsage":"10.5MiB / 512MiB","NetIO":"1kB / 2kB","BlockIO":"0B / 4.1MB"}"#;
        let stats = parse_docker_stats(raw).unwrap();
        assert_eq!(stats.len(), 1);
        let s = &stats[0];
        assert_eq!(s.container_id, "abc123");
        assert!((s.cpu_percent - 1.23).abs() < 0.001);
        assert_eq!(s.memory_limit_bytes, 512 * 1024 * 1024);
    }
}
