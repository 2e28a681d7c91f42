//! Launching and polling the monitored command

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::error::{LaunchError, LaunchResult};

/// Whether the monitored child is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Running,

    /// Exited with the given code; `None` when killed by a signal or the
    /// status could not be collected
    Exited(Option<i32>),
}

/// Handle on a launched child process.
pub trait MonitoredProcess: Send {
    fn pid(&self) -> u32;

    /// Non-blocking exit check.
    fn poll(&mut self) -> Liveness;
}

/// Starts the command to monitor.
pub trait ProcessLauncher: Send {
    type Process: MonitoredProcess;

    fn launch(&mut self, command: &[String]) -> LaunchResult<Self::Process>;
}

/// Spawns commands as real child processes sharing our stdio.
///
/// The child is left running if the handle is dropped, so an interrupted
/// monitor does not kill the workload it was watching.
#[derive(Debug, Default, Clone)]
pub struct CommandLauncher;

impl CommandLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for CommandLauncher {
    type Process = ChildProcess;

    fn launch(&mut self, command: &[String]) -> LaunchResult<ChildProcess> {
        let (program, args) = command.split_first().ok_or(LaunchError::EmptyCommand)?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| LaunchError::SpawnFailed {
                program: program.clone(),
                reason: e.to_string(),
            })?;

        let pid = child.id().ok_or_else(|| LaunchError::MissingPid { program: program.clone() })?;
        info!(pid, "Launched {}", program);

        Ok(ChildProcess { child, pid })
    }
}

/// A child spawned by [`CommandLauncher`].
pub struct ChildProcess {
    child: Child,
    pid: u32,
}

impl MonitoredProcess for ChildProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn poll(&mut self) -> Liveness {
        match self.child.try_wait() {
            Ok(Some(status)) => Liveness::Exited(status.code()),
            Ok(None) => Liveness::Running,
            Err(e) => {
                warn!(pid = self.pid, "Failed to poll child status: {}", e);
                Liveness::Exited(None)
            }
        }
    }
}
