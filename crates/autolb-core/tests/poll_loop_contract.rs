//! Contract Test: Poll Loop
//!
//! This test verifies the long-running behavior of the engine.
//!
//! Constraints verified:
//! - The loop survives a failed cycle and reconciles on the next one
//! - A configuration error stops the loop and is returned to the caller
//! - A load balancer deleted between cycles loses its record
//! - Shutdown terminates the loop promptly and deterministically
//! - Lifecycle events are emitted in order
//!
//! If this test fails, someone has:
//! - Made a transient cycle error fatal to the loop
//! - Added a sleep that ignores the shutdown signal
//! - Spawned detached tasks that outlive the engine

mod common;

use autolb_core::{AutolbEngine, EngineEvent, Error};
use common::*;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

fn drain(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn shutdown_signal_terminates_engine() {
    let inventory = ScriptedInventory::with(vec![tagged("web")]).await;
    let zone = RecordingZone::new().await;
    let (engine, mut event_rx) =
        AutolbEngine::new(Box::new(inventory), Box::new(zone.clone()), minimal_config())
            .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let engine_handle = tokio::spawn(async move { engine.run_until(shutdown_rx).await });

    // Wait for the first cycle
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(shutdown_tx.send(()).is_ok(), "shutdown signal send succeeds");

    let result = tokio::time::timeout(Duration::from_secs(5), engine_handle).await;
    assert!(result.is_ok(), "Engine should terminate within 5 seconds");
    let engine_result = result.unwrap().unwrap();
    assert!(engine_result.is_ok(), "Engine should shut down successfully: {:?}", engine_result);

    let events = drain(&mut event_rx);
    assert!(matches!(events.first(), Some(EngineEvent::Started { .. })));
    assert!(matches!(events.last(), Some(EngineEvent::Stopped { .. })));
    assert!(events.iter().any(|e| matches!(e, EngineEvent::RecordCreated { .. })));
    assert!(events.iter().any(|e| matches!(e, EngineEvent::CycleCompleted(_))));

    assert_eq!(zone.target_of(&owned_name("web")).await.as_deref(), Some("web.elb.test"));
}

#[tokio::test]
async fn dropped_shutdown_sender_stops_engine() {
    let (engine, _event_rx) = AutolbEngine::new(
        Box::new(ScriptedInventory::new()),
        Box::new(RecordingZone::new().await),
        minimal_config(),
    )
    .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let engine_handle = tokio::spawn(async move { engine.run_until(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(shutdown_tx);

    let result = tokio::time::timeout(Duration::from_secs(5), engine_handle).await;
    assert!(result.is_ok(), "Engine should stop when the sender goes away");
}

#[tokio::test]
async fn loop_continues_after_failed_cycle() {
    let inventory = ScriptedInventory::with(vec![tagged("web")]).await;
    inventory.fail_next_lists(1);
    let zone = RecordingZone::new().await;
    let (engine, mut event_rx) = AutolbEngine::new(
        Box::new(inventory.clone()),
        Box::new(zone.clone()),
        minimal_config(),
    )
    .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let engine_handle = tokio::spawn(async move { engine.run_until(shutdown_rx).await });

    // First cycle fails; the second runs one poll interval later
    let converged = tokio::time::timeout(Duration::from_secs(5), async {
        while zone.target_of(&owned_name("web")).await.is_none() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(converged.is_ok(), "Second cycle should create the record");

    shutdown_tx.send(()).unwrap();
    engine_handle.await.unwrap().unwrap();

    assert!(inventory.list_calls() >= 2);

    let events = drain(&mut event_rx);
    let aborted = events
        .iter()
        .position(|e| matches!(e, EngineEvent::CycleAborted { .. }))
        .expect("first cycle reports an abort");
    let completed = events
        .iter()
        .position(|e| matches!(e, EngineEvent::CycleCompleted(_)))
        .expect("a later cycle completes");
    assert!(aborted < completed);
}

#[tokio::test]
async fn mutation_failures_are_reported_as_events() {
    let inventory = ScriptedInventory::with(vec![tagged("web")]).await;
    let zone = RecordingZone::new().await;
    zone.fail_record(&owned_name("web"));
    let (engine, mut event_rx) =
        AutolbEngine::new(Box::new(inventory), Box::new(zone.clone()), minimal_config())
            .expect("engine construction succeeds");

    let report = engine.run_cycle().await.expect("cycle completes");
    assert_eq!(report.applied.failures.len(), 1);

    let events = drain(&mut event_rx);
    let failure = events
        .iter()
        .find_map(|e| match e {
            EngineEvent::MutationFailed(failure) => Some(failure.clone()),
            _ => None,
        })
        .expect("failure event emitted");
    assert_eq!(failure.record_name, owned_name("web"));
    assert_eq!(failure.load_balancer.as_deref(), Some("web"));
}

#[tokio::test]
async fn configuration_error_stops_the_loop() {
    let inventory = ScriptedInventory::with(vec![tagged("web")]).await;
    inventory.reject_credentials();
    let zone = RecordingZone::new().await;
    let (engine, mut event_rx) = AutolbEngine::new(
        Box::new(inventory.clone()),
        Box::new(zone.clone()),
        minimal_config(),
    )
    .expect("engine construction succeeds");

    // Kept alive so only the error can end the loop
    let (_shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let result = tokio::time::timeout(Duration::from_secs(5), engine.run_until(shutdown_rx))
        .await
        .expect("fatal error ends the loop without waiting for shutdown");

    assert!(matches!(result, Err(Error::Config(_))), "got {:?}", result);
    assert_eq!(inventory.list_calls(), 1);
    assert_eq!(zone.mutation_calls(), 0);

    let events = drain(&mut event_rx);
    assert!(events.iter().any(|e| matches!(e, EngineEvent::CycleAborted { .. })));
    match events.last() {
        Some(EngineEvent::Stopped { reason }) => assert!(reason.contains("no credentials")),
        other => panic!("expected a Stopped event last, got {:?}", other),
    }
}

#[tokio::test]
async fn load_balancer_deleted_between_cycles_loses_its_record() {
    let inventory = ScriptedInventory::with(vec![tagged("web"), tagged("api")]).await;
    let zone = RecordingZone::new().await;
    let (engine, _event_rx) = AutolbEngine::new(
        Box::new(inventory.clone()),
        Box::new(zone.clone()),
        minimal_config(),
    )
    .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let engine_handle = tokio::spawn(async move { engine.run_until(shutdown_rx).await });

    let created = tokio::time::timeout(Duration::from_secs(5), async {
        while zone.records().await.len() < 2 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(created.is_ok(), "first cycle should create both records");

    let removed = inventory.inner.remove("web").await;
    assert_eq!(removed.map(|lb| lb.dns_name).as_deref(), Some("web.elb.test"));

    let cleaned = tokio::time::timeout(Duration::from_secs(5), async {
        while zone.target_of(&owned_name("web")).await.is_some() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(cleaned.is_ok(), "a later cycle should delete the orphaned record");

    shutdown_tx.send(()).unwrap();
    engine_handle.await.unwrap().unwrap();

    assert_eq!(zone.target_of(&owned_name("api")).await.as_deref(), Some("api.elb.test"));
    assert_eq!(inventory.inner.len().await, 1);
}
