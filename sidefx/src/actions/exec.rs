// ABOUTME: executes the RunCommand action by spawning a subprocess and waiting for it.
// ABOUTME: output is discarded; the pid and exit status are logged.

use std::process::Stdio;

use sidefx_common::RunCommandAction;
use tokio::process::Command;
use tracing::info;

use crate::errors::FatalError;

/// Whether an unsuccessful exit status ends the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExitCodePolicy {
    /// Non-zero exit or death by signal is fatal.
    #[default]
    Strict,
    /// Only spawn and wait errors are fatal.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandReport {
    pub pid: u32,
    pub exit_code: i32,
}

pub async fn run(exec: &RunCommandAction, policy: ExitCodePolicy) -> Result<CommandReport, FatalError> {
    let mut child = Command::new(&exec.path)
        .args(&exec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| FatalError::Spawn {
            path: exec.path.clone(),
            source,
        })?;

    // id() is only None once the child has been reaped.
    let pid = child.id().unwrap_or_default();

    let status = child.wait().await.map_err(|source| FatalError::Wait {
        path: exec.path.clone(),
        pid,
        source,
    })?;

    // Killed by a signal: no code.
    let exit_code = status.code().unwrap_or(-1);

    if policy == ExitCodePolicy::Strict && !status.success() {
        return Err(FatalError::ExitStatus {
            path: exec.path.clone(),
            pid,
            exit_code,
        });
    }

    info!(
        action = "RunCommand",
        cmd_path = %exec.path,
        cmd_args = ?exec.args,
        cmd_pid = pid,
        cmd_exit_status = exit_code,
        "RunCommand"
    );

    Ok(CommandReport { pid, exit_code })
}
