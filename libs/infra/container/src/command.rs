use std::path::Path;

use tokio::process::Command;
use tracing::{debug, instrument};

use fleet_domain_models::FleetError;

/// Outcome of a shell invocation: exit status plus captured output, merged
/// for logging but kept separate for callers that need just one stream.
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs `command` through a shell in `working_dir`, capturing output rather
/// than inheriting the parent's stdio.
#[instrument(skip(command))]
pub async fn run_adapter_command(
    working_dir: Option<&Path>,
    command: &str,
) -> Result<CommandOutput, FleetError> {
    debug!(%command, "running adapter command");
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .await
        .map_err(|e| FleetError::ContainerOperationFailed(format!("spawn failed: {e}")))?;

    Ok(CommandOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
