use std::time::Duration;

use anyhow::Result;
use proptest::prelude::*;
use procwatch_monitor::error::LaunchError;
use procwatch_monitor::{MonitorError, MonitorState, ShutdownSignal, Termination};

use super::{command, scripted_monitor};
use crate::init_test_environment;
use crate::mocks::{snapshot, RecordingSink, ScriptedLauncher, ScriptedReader};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[tokio::test(start_paused = true)]
async fn test_two_ticks_then_vanished() -> Result<()> {
    init_test_environment();
    let reader = ScriptedReader::new(vec![
        Some(snapshot(100.0, 1.0, 1.0, 0.5)),
        Some(snapshot(120.0, 1.7, 1.5, 0.75)),
        None,
    ]);
    let sink = RecordingSink::new("recorder");
    let mut monitor = scripted_monitor(1.0, reader, ScriptedLauncher::running(77), ShutdownSignal::new());

    let run = monitor.run(&command(&["workload"]), sink.boxed()).await?;

    assert_eq!(run.pid, 77);
    assert_eq!(run.termination, Termination::ProcessVanished);
    assert_eq!(run.series.len(), 2);

    let samples = run.series.samples();
    assert_eq!(samples[0].elapsed_seconds, 0.0);
    assert_eq!(samples[0].cpu_percent, 0.0);
    assert_eq!(samples[0].memory_mb, 100.0);
    assert_eq!(samples[0].io_read_mb, 1.0);
    assert_eq!(samples[0].io_write_mb, 0.5);

    assert_eq!(samples[1].elapsed_seconds, 1.0);
    assert!(approx(samples[1].cpu_percent, 70.0));
    assert_eq!(samples[1].memory_mb, 120.0);
    assert_eq!(samples[1].io_read_mb, 1.5);
    assert_eq!(samples[1].io_write_mb, 0.75);

    assert_eq!(sink.samples(), samples.to_vec());
    assert_eq!(sink.close_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_absent_on_first_tick_yields_empty_series() -> Result<()> {
    let reader = ScriptedReader::new(vec![None]);
    let sink = RecordingSink::new("recorder");
    let mut monitor = scripted_monitor(10.0, reader, ScriptedLauncher::running(5), ShutdownSignal::new());

    let run = monitor.run(&command(&["short-lived"]), sink.boxed()).await?;

    assert_eq!(run.termination, Termination::ProcessVanished);
    assert!(run.series.is_empty());
    assert!(sink.samples().is_empty());
    assert_eq!(sink.close_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_exit_is_detected_before_reading() -> Result<()> {
    let reader = ScriptedReader::repeating(snapshot(10.0, 0.0, 0.0, 0.0), 50);
    let reads = reader.read_counter();
    let sink = RecordingSink::new("recorder");
    let mut monitor = scripted_monitor(
        4.0,
        reader,
        ScriptedLauncher::exiting_after(9, 2, 3),
        ShutdownSignal::new(),
    );

    let run = monitor.run(&command(&["job"]), sink.boxed()).await?;

    assert_eq!(run.termination, Termination::ProcessExited(Some(3)));
    assert_eq!(run.series.len(), 2);
    assert_eq!(*reads.lock().unwrap(), 2);
    let times: Vec<f64> = run.series.iter().map(|s| s.elapsed_seconds).collect();
    assert_eq!(times, vec![0.0, 0.25]);
    assert_eq!(monitor.state(), MonitorState::Terminated);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_before_start_collects_nothing() -> Result<()> {
    let shutdown = ShutdownSignal::new();
    shutdown.trigger();
    let sink = RecordingSink::new("recorder");
    let mut monitor = scripted_monitor(
        10.0,
        ScriptedReader::repeating(snapshot(1.0, 0.0, 0.0, 0.0), 10),
        ScriptedLauncher::running(1),
        shutdown,
    );

    let run = monitor.run(&command(&["idle"]), sink.boxed()).await?;

    assert_eq!(run.termination, Termination::Cancelled);
    assert!(run.series.is_empty());
    assert_eq!(sink.close_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_the_pause() -> Result<()> {
    let shutdown = ShutdownSignal::new();
    let sink = RecordingSink::new("recorder");
    let mut monitor = scripted_monitor(
        0.1,
        ScriptedReader::repeating(snapshot(1.0, 0.0, 0.0, 0.0), 10),
        ScriptedLauncher::running(1),
        shutdown.clone(),
    );

    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown.trigger();
    });

    let started = tokio::time::Instant::now();
    let run = monitor.run(&command(&["idle"]), sink.boxed()).await?;
    trigger.await?;

    // One sample, then cancelled well inside the ten second pause
    assert_eq!(run.termination, Termination::Cancelled);
    assert_eq!(run.series.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(sink.close_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_spawn_failure_surfaces_and_closes_sink() {
    let sink = RecordingSink::new("recorder");
    let mut monitor = scripted_monitor(
        10.0,
        ScriptedReader::new(Vec::new()),
        ScriptedLauncher::failing("No such file or directory"),
        ShutdownSignal::new(),
    );

    let result = monitor.run(&command(&["missing-binary"]), sink.boxed()).await;

    match result {
        Err(MonitorError::Launch(LaunchError::SpawnFailed { program, .. })) => {
            assert_eq!(program, "missing-binary");
        }
        other => panic!("expected spawn failure, got {:?}", other.map(|run| run.termination)),
    }
    assert!(sink.samples().is_empty());
    assert_eq!(sink.close_count(), 1);
}

fn run_paused<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_elapsed_is_non_decreasing(
        frequency_hz in 0.5f64..1000.0,
        cpu_steps in prop::collection::vec(0.0f64..2.0, 1..20),
    ) {
        let mut cpu = 0.0;
        let script: Vec<_> = cpu_steps
            .iter()
            .map(|step| {
                cpu += step;
                Some(snapshot(64.0, cpu, 0.0, 0.0))
            })
            .collect();
        let expected = script.len();

        let run = run_paused(async {
            let mut monitor = scripted_monitor(
                frequency_hz,
                ScriptedReader::new(script),
                ScriptedLauncher::running(1),
                ShutdownSignal::new(),
            );
            monitor.run(&command(&["load"]), RecordingSink::new("recorder").boxed()).await
        })
        .unwrap();

        prop_assert_eq!(run.series.len(), expected);
        let samples = run.series.samples();
        prop_assert_eq!(samples[0].cpu_percent, 0.0);
        for pair in samples.windows(2) {
            prop_assert!(pair[1].elapsed_seconds >= pair[0].elapsed_seconds);
            prop_assert!(pair[1].cpu_percent.is_finite());
            prop_assert!(pair[1].cpu_percent >= 0.0);
        }
    }
}
