// [libs/infra/container/src/adapter.rs]
/*!
 * =================================================================
 * APARATO: ADAPTADOR DE CONTENEDORES COMPOSE (ESTRATO L3)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER
 * RESPONSABILIDAD: EJECUCIÓN DEL CLI DE COMPOSE Y DISCO DE TRABAJO
 *
 * Cada app vive en su propio directorio de trabajo; subir, bajar y
 * destruir una app son, en el fondo, invocaciones del binario de
 * compose contra el `docker-compose.yml` de ese directorio.
 * =================================================================
 */

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::{instrument, warn};

use fleet_domain_models::FleetError;

use crate::command::run_adapter_command;
use crate::stats::ContainerStats;

/// Presence/liveness as observed by `docker compose ps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerPresence {
    Running,
    Stopped,
    Unknown,
}

/// A narrow facade over the host's container runtime. One implementation
/// shells out to `docker compose`; tests substitute a fake.
///
/// The adapter itself does not serialize calls against the same app — that
/// is the caller's (the lifecycle service's) responsibility.
#[async_trait]
pub trait ContainerAdapter: Send + Sync {
    async fn create_directory(&self, app_name: &str) -> Result<PathBuf, FleetError>;
    async fn write_compose(&self, app_name: &str, content: &str) -> Result<(), FleetError>;
    async fn up(&self, app_name: &str) -> Result<(), FleetError>;
    async fn down(&self, app_name: &str) -> Result<(), FleetError>;
    async fn update(&self, app_name: &str) -> Result<(), FleetError>;
    async fn force_recreate_sidecar(&self, app_name: &str) -> Result<(), FleetError>;
    async fn ps(&self, app_name: &str) -> Result<ContainerPresence, FleetError>;
    async fn logs(&self, app_name: &str, tail: usize) -> Result<Vec<String>, FleetError>;
    async fn stats(&self, app_name: &str) -> Result<Vec<ContainerStats>, FleetError>;
    async fn restart_sidecar(&self, app_name: &str) -> Result<(), FleetError>;
    async fn stop_sidecar(&self, app_name: &str) -> Result<(), FleetError>;
    async fn remove_sidecar(&self, app_name: &str) -> Result<(), FleetError>;
    async fn restart_container(&self, container_id: &str) -> Result<(), FleetError>;
    async fn stop_container(&self, container_id: &str) -> Result<(), FleetError>;
    async fn remove_container(&self, container_id: &str) -> Result<(), FleetError>;
    async fn delete_directory(&self, app_name: &str) -> Result<(), FleetError>;
}

/// `docker compose`-backed implementation. Every app gets its own directory
/// under `apps_root`, holding exactly one `compose.yaml`.
pub struct ComposeContainerAdapter {
    apps_root: PathBuf,
}

impl ComposeContainerAdapter {
    pub fn new(apps_root: impl Into<PathBuf>) -> Self {
        Self {
            apps_root: apps_root.into(),
        }
    }

    fn app_dir(&self, app_name: &str) -> PathBuf {
        self.apps_root.join(app_name)
    }

    fn compose_path(&self, app_name: &str) -> PathBuf {
        self.app_dir(app_name).join("compose.yaml")
    }

    async fn run(&self, app_name: &str, args: &str) -> Result<crate::command::CommandOutput, FleetError> {
        let dir = self.app_dir(app_name);
        let command = format!("docker compose -f compose.yaml {args}");
        run_adapter_command(Some(&dir), &command).await
    }
}

#[async_trait]
impl ContainerAdapter for ComposeContainerAdapter {
    #[instrument(skip(self))]
    async fn create_directory(&self, app_name: &str) -> Result<PathBuf, FleetError> {
        let dir = self.app_dir(app_name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| FleetError::ContainerOperationFailed(format!("create directory: {e}")))?;
        Ok(dir)
    }

    async fn write_compose(&self, app_name: &str, content: &str) -> Result<(), FleetError> {
        fs::write(self.compose_path(app_name), content)
            .await
            .map_err(|e| FleetError::ContainerOperationFailed(format!("write compose: {e}")))
    }

    #[instrument(skip(self))]
    async fn up(&self, app_name: &str) -> Result<(), FleetError> {
        let out = self.run(app_name, "up -d --remove-orphans").await?;
        if !out.success {
            return Err(FleetError::ContainerOperationFailed(out.combined()));
        }
        Ok(())
    }

    async fn down(&self, app_name: &str) -> Result<(), FleetError> {
        let out = self.run(app_name, "down").await?;
        if !out.success {
            return Err(FleetError::ContainerOperationFailed(out.combined()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update(&self, app_name: &str) -> Result<(), FleetError> {
        let pull = self.run(app_name, "pull").await?;
        if !pull.success {
            warn!(%app_name, stderr = %pull.stderr, "compose pull failed, continuing with cached images");
        }
        let up = self.run(app_name, "up -d --build --remove-orphans").await?;
        if !up.success {
            return Err(FleetError::ContainerOperationFailed(up.combined()));
        }
        Ok(())
    }

    async fn force_recreate_sidecar(&self, app_name: &str) -> Result<(), FleetError> {
        let args = format!(
            "up -d --force-recreate --no-deps {}",
            fleet_compose::SIDECAR_SERVICE_NAME
        );
        let out = self.run(app_name, &args).await?;
        if !out.success {
            return Err(FleetError::ContainerOperationFailed(out.combined()));
        }
        Ok(())
    }

    async fn ps(&self, app_name: &str) -> Result<ContainerPresence, FleetError> {
        let out = self.run(app_name, "ps --status running --format json").await?;
        if !out.success {
            return Ok(ContainerPresence::Unknown);
        }
        if out.stdout.trim().is_empty() {
            let stopped = self.run(app_name, "ps -a --format json").await?;
            if stopped.stdout.trim().is_empty() {
                return Ok(ContainerPresence::Unknown);
            }
            return Ok(ContainerPresence::Stopped);
        }
        Ok(ContainerPresence::Running)
    }

    async fn logs(&self, app_name: &str, tail: usize) -> Result<Vec<String>, FleetError> {
        let args = format!("logs --no-color --tail {tail}");
        let out = self.run(app_name, &args).await?;
        if !out.success {
            return Err(FleetError::ContainerOperationFailed(out.combined()));
        }
        let mut lines: Vec<String> = out
            .stdout
            .lines()
            .chain(out.stderr.lines())
            .map(str::to_string)
            .collect();
        lines.reverse();
        Ok(lines)
    }

    async fn stats(&self, app_name: &str) -> Result<Vec<ContainerStats>, FleetError> {
        let out = self
            .run(app_name, "stats --no-stream --format json")
            .await?;
        if !out.success {
            return Err(FleetError::ContainerOperationFailed(out.combined()));
        }
        crate::stats::parse_docker_stats(&out.stdout)
    }

    async fn restart_sidecar(&self, app_name: &str) -> Result<(), FleetError> {
        let args = format!("restart {}", fleet_compose::SIDECAR_SERVICE_NAME);
        let out = self.run(app_name, &args).await?;
        if !out.success && !out.combined().contains("no such service") {
            return Err(FleetError::ContainerOperationFailed(out.combined()));
        }
        Ok(())
    }

    async fn stop_sidecar(&self, app_name: &str) -> Result<(), FleetError> {
        let args = format!("stop {}", fleet_compose::SIDECAR_SERVICE_NAME);
        let out = self.run(app_name, &args).await?;
        if !out.success && !out.combined().contains("no such service") {
            return Err(FleetError::ContainerOperationFailed(out.combined()));
        }
        Ok(())
    }

    async fn remove_sidecar(&self, app_name: &str) -> Result<(), FleetError> {
        let args = format!(
            "rm -f -s {}",
            fleet_compose::SIDECAR_SERVICE_NAME
        );
        let out = self.run(app_name, &args).await?;
        if !out.success && !out.combined().contains("no such service") {
            return Err(FleetError::ContainerOperationFailed(out.combined()));
        }
        Ok(())
    }

    async fn restart_container(&self, container_id: &str) -> Result<(), FleetError> {
        let out = run_adapter_command(None, &format!("docker restart {container_id}")).await?;
        if !out.success {
            return Err(FleetError::ContainerOperationFailed(out.combined()));
        }
        Ok(())
    }

    async fn stop_container(&self, container_id: &str) -> Result<(), FleetError> {
        let out = run_adapter_command(None, &format!("docker stop {container_id}")).await?;
        if !out.success {
            return Err(FleetError::ContainerOperationFailed(out.combined()));
        }
        Ok(())
    }

    async fn remove_container(&self, container_id: &str) -> Result<(), FleetError> {
        let out = run_adapter_command(None, &format!("docker rm -f {container_id}")).await?;
        if !out.success {
            return Err(FleetError::ContainerOperationFailed(out.combined()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_directory(&self, app_name: &str) -> Result<(), FleetError> {
        let dir = self.app_dir(app_name);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FleetError::ContainerOperationFailed(format!(
                "delete directory: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_write_and_delete_directory_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let adapter = ComposeContainerAdapter::new(root.path());

        let dir = adapter.create_directory("demo-app").await.unwrap();
        assert!(dir.exists());

        adapter
            .write_compose("demo-app", "services:\n  web:\n    image: nginx\n")
            .await
            .unwrap();
        let written = fs::read_to_string(dir.join("compose.yaml")).await.unwrap();
        assert!(written.contains("nginx"));

        adapter.delete_directory("demo-app").await.unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn delete_directory_on_missing_app_is_not_an_error() {
        let root = tempfile::tempdir().unwrap();
        let adapter = ComposeContainerAdapter::new(root.path());
        adapter.delete_directory("never-created").await.unwrap();
    }
}
