// tests/watch_behaviour.rs
//
// Watch-loop behaviour against a real notify subscription inside a tempdir.

use std::error::Error;
use std::time::Duration;

use testwatch_test_utils::{init_tracing, wait_until};

use testwatch::errors::TestwatchError;
use testwatch::types::{BusyBehaviour, RunParameters};
use testwatch_test_utils::harness::{harness, TestHarness};
use testwatch_test_utils::process::ScriptedBackend;

type TestResult = Result<(), Box<dyn Error>>;

/// Time allowed for a filesystem event to travel through notify.
const FS_SETTLE: Duration = Duration::from_millis(400);

async fn settle() {
    tokio::time::sleep(FS_SETTLE).await;
}

#[tokio::test]
async fn watch_performs_exactly_one_priming_run() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let backend = ScriptedBackend::passing();
    let counter = backend.clone();
    let h = harness(dir.path(), Box::new(backend), BusyBehaviour::Ignore);

    h.orch.watch(RunParameters::default()).await?;
    assert!(h.orch.state().is_watching());

    // Exactly one run, with no filesystem event required.
    assert!(wait_until(|| counter.spawn_count() == 1, Duration::from_secs(2)).await);
    settle().await;
    assert_eq!(counter.spawn_count(), 1);

    h.orch.unwatch().await?;
    Ok(())
}

#[tokio::test]
async fn second_watch_is_rejected_while_first_is_active() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let h = harness(
        dir.path(),
        Box::new(ScriptedBackend::passing()),
        BusyBehaviour::Ignore,
    );

    h.orch.watch(RunParameters::default()).await?;

    let err = h
        .orch
        .watch(RunParameters::default())
        .await
        .expect_err("second watch must be rejected");
    assert!(matches!(err, TestwatchError::AlreadyWatching));
    assert!(h.orch.state().is_watching());

    h.orch.unwatch().await?;
    Ok(())
}

#[tokio::test]
async fn unwatch_without_session_and_double_unwatch_yield_not_watching() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let h = harness(
        dir.path(),
        Box::new(ScriptedBackend::passing()),
        BusyBehaviour::Ignore,
    );

    let err = h.orch.unwatch().await.expect_err("no session active");
    assert!(matches!(err, TestwatchError::NotWatching));

    h.orch.watch(RunParameters::default()).await?;
    h.orch.unwatch().await?;

    let err = h.orch.unwatch().await.expect_err("session already stopped");
    assert!(matches!(err, TestwatchError::NotWatching));
    assert!(!h.orch.state().is_watching());

    Ok(())
}

#[tokio::test]
async fn change_while_running_is_dropped_and_change_while_idle_reruns() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let (backend, gate) = ScriptedBackend::passing().gated();
    let counter = backend.clone();
    let h = harness(dir.path(), Box::new(backend), BusyBehaviour::Ignore);

    // Priming run starts and stays in flight behind the gate.
    h.orch.watch(RunParameters::default()).await?;
    assert!(wait_until(|| counter.spawn_count() == 1, Duration::from_secs(2)).await);
    assert!(h.orch.state().is_running());

    // A change arriving mid-run is dropped, not queued.
    std::fs::write(dir.path().join("main.go"), "package main\n")?;
    settle().await;
    assert_eq!(counter.spawn_count(), 1);

    // Finish the run; with the default policy nothing fires on completion.
    gate.notify_one();
    assert!(wait_until(|| !h.orch.state().is_running(), Duration::from_secs(2)).await);
    settle().await;
    assert_eq!(counter.spawn_count(), 1);

    // The same kind of change while idle triggers exactly one rerun. The
    // new run stays gated, so duplicate notifications for this write are
    // dropped instead of fanning out into more runs.
    std::fs::write(dir.path().join("main.go"), "package main // edited\n")?;
    assert!(wait_until(|| counter.spawn_count() == 2, Duration::from_secs(2)).await);
    settle().await;
    assert_eq!(counter.spawn_count(), 2);

    h.orch.unwatch().await?;
    Ok(())
}

#[tokio::test]
async fn queue_policy_coalesces_mid_run_changes_into_one_rerun() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let (backend, gate) = ScriptedBackend::passing().gated();
    let counter = backend.clone();
    let h = harness(dir.path(), Box::new(backend), BusyBehaviour::Queue);

    h.orch.watch(RunParameters::default()).await?;
    assert!(wait_until(|| counter.spawn_count() == 1, Duration::from_secs(2)).await);

    // Several changes while the priming run is still in flight.
    for i in 0..3 {
        std::fs::write(dir.path().join("main.go"), format!("package main // {i}\n"))?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    settle().await;
    assert_eq!(counter.spawn_count(), 1, "changes must not start runs mid-run");

    // Completion fires exactly one queued rerun.
    gate.notify_one();
    assert!(wait_until(|| counter.spawn_count() == 2, Duration::from_secs(2)).await);
    settle().await;
    assert_eq!(counter.spawn_count(), 2, "pending changes coalesce into one rerun");

    h.orch.unwatch().await?;
    Ok(())
}

#[tokio::test]
async fn unwatch_does_not_cancel_an_in_flight_run() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let (backend, gate) = ScriptedBackend::passing().gated();
    let counter = backend.clone();
    let TestHarness { orch, .. } = harness(dir.path(), Box::new(backend), BusyBehaviour::Ignore);

    orch.watch(RunParameters::default()).await?;
    assert!(wait_until(|| counter.spawn_count() == 1, Duration::from_secs(2)).await);
    assert!(orch.state().is_running());

    // Stopping the watch leaves the run in flight; it completes naturally.
    orch.unwatch().await?;
    assert!(orch.state().is_running());

    gate.notify_one();
    assert!(wait_until(|| !orch.state().is_running(), Duration::from_secs(2)).await);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watch_can_be_restarted_after_unwatch() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let backend = ScriptedBackend::passing();
    let counter = backend.clone();
    let h = harness(dir.path(), Box::new(backend), BusyBehaviour::Ignore);

    h.orch.watch(RunParameters::default()).await?;
    assert!(wait_until(|| counter.spawn_count() == 1, Duration::from_secs(2)).await);
    h.orch.unwatch().await?;
    assert!(wait_until(|| !h.orch.state().is_watching(), Duration::from_secs(2)).await);

    // A fresh session registers cleanly and primes again.
    h.orch.watch(RunParameters::default()).await?;
    assert!(wait_until(|| counter.spawn_count() == 2, Duration::from_secs(2)).await);
    assert!(h.orch.state().is_watching());

    h.orch.unwatch().await?;
    Ok(())
}
