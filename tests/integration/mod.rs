//! Scenario tests for the sampling loop and its outputs

#[cfg(test)]
mod test_sampling_loop;
#[cfg(test)]
mod test_tree_snapshots;

use procwatch_monitor::config::SamplingConfig;
use procwatch_monitor::{Monitor, ShutdownSignal};

use crate::mocks::{ScriptedLauncher, ScriptedReader};

/// Monitor wired to scripted collaborators.
pub fn scripted_monitor(
    frequency_hz: f64,
    reader: ScriptedReader,
    launcher: ScriptedLauncher,
    shutdown: ShutdownSignal,
) -> Monitor<ScriptedReader, ScriptedLauncher> {
    Monitor::new(SamplingConfig { frequency_hz }, reader, launcher, shutdown)
}

pub fn command(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}
