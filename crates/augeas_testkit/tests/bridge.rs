//! Integration tests for asynchronous saves.

use augeas_core::{Augeas, ErrorCode, PersistBridge, SaveState};
use augeas_testkit::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn session_comes_back_with_its_tree() {
    let bridge = PersistBridge::new();
    let mut aug = TestSession::hosts().into_inner();
    aug.set(&format!("{HOSTS}/1/ipaddr"), Some("10.0.0.1")).unwrap();

    let returned = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&returned);
    bridge
        .submit(aug, move |aug, result| {
            result.unwrap();
            *slot.lock() = Some(aug);
        })
        .unwrap();
    bridge.run_until_idle();

    let aug = returned.lock().take().unwrap();
    assert_eq!(
        aug.engine().saved_value(&format!("{HOSTS}/1/ipaddr")).as_deref(),
        Some("10.0.0.1")
    );
    assert_eq!(
        aug.get(&format!("{HOSTS}/2/canonical")).unwrap().as_deref(),
        Some("gateway")
    );
}

#[test]
fn failed_save_reports_engine_error() {
    let bridge = PersistBridge::new();
    let mut engine = MemoryEngine::new();
    engine.fail_next_save("disk full");

    let outcome = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&outcome);
    bridge
        .submit(Augeas::from_engine(engine), move |aug, result| {
            *slot.lock() = Some((result.map_err(|e| e.code()), aug.error()));
        })
        .unwrap();
    assert_eq!(bridge.run_until_idle(), 1);

    let (result, code) = outcome.lock().take().unwrap();
    assert_eq!(result, Err(Some(ErrorCode::Internal)));
    assert_eq!(code, ErrorCode::Internal);
}

#[test]
fn many_sessions_save_concurrently() {
    let bridge = PersistBridge::new();
    let delivered = Arc::new(Mutex::new(Vec::new()));

    let tickets: Vec<_> = (0..8)
        .map(|i| {
            let delivered = Arc::clone(&delivered);
            let engine = MemoryEngine::new().with_save_delay(Duration::from_millis(20));
            bridge
                .submit(Augeas::from_engine(engine), move |aug, result| {
                    assert!(result.is_ok());
                    delivered.lock().push((i, aug.engine().saves()));
                })
                .unwrap()
        })
        .collect();

    assert_eq!(bridge.run_until_idle(), 8);
    assert_eq!(bridge.in_flight(), 0);
    assert!(tickets.iter().all(|t| t.state() == SaveState::Idle));

    let mut delivered = delivered.lock().clone();
    delivered.sort_unstable();
    assert_eq!(delivered, (0..8).map(|i| (i, 1)).collect::<Vec<_>>());
}

#[test]
fn run_pending_does_not_block() {
    let bridge = PersistBridge::new();
    let engine = MemoryEngine::new().with_save_delay(Duration::from_millis(200));
    let ticket = bridge.submit(Augeas::from_engine(engine), |_, _| {}).unwrap();

    assert_eq!(bridge.run_pending(), 0);
    assert!(ticket.state().is_pending());
    assert_eq!(bridge.run_until_idle(), 1);
    assert!(!ticket.state().is_pending());
}
