//! Slot switching: isolation between slots, preference persistence,
//! and flush-before-switch ordering.

use std::path::Path;
use std::time::Duration;

use save_engine::{EngineConfig, SaveEngine, SaveError};

fn test_config(root: &Path) -> EngineConfig {
    EngineConfig::new(root)
        .with_debounce(Duration::from_millis(50))
        .with_retry_delay(Duration::from_millis(10))
}

fn slot_file(root: &Path, slot: u8) -> std::path::PathBuf {
    root.join(format!("slot_{slot}")).join("savegame.json")
}

#[tokio::test]
async fn switch_out_of_range_fails_fast() {
    let root = tempfile::tempdir().unwrap();
    let engine = SaveEngine::start(test_config(root.path())).await.unwrap();

    let err = engine.switch_slot(3).await.unwrap_err();
    assert!(matches!(err, SaveError::SlotOutOfRange { index: 3, max: 3 }));
    assert_eq!(engine.active_slot(), 0);
}

#[tokio::test]
async fn switch_to_active_slot_is_a_no_op() {
    let root = tempfile::tempdir().unwrap();
    let engine = SaveEngine::start(test_config(root.path())).await.unwrap();
    engine.flush().await.unwrap();
    let before = engine.metrics().flushes;

    engine.switch_slot(0).await.unwrap();

    assert_eq!(engine.active_slot(), 0);
    assert_eq!(engine.metrics().flushes, before);
}

#[tokio::test]
async fn slots_are_isolated_and_reload_unchanged() {
    let root = tempfile::tempdir().unwrap();
    let engine = SaveEngine::start(test_config(root.path())).await.unwrap();

    engine.set_coins(111);
    engine.flush().await.unwrap();

    engine.switch_slot(1).await.unwrap();
    assert_eq!(engine.active_slot(), 1);
    // The new slot starts from its own (fresh) record.
    assert_eq!(engine.coins(), 0);

    engine.set_coins(222);
    engine.flush().await.unwrap();

    let slot0 = save_core::open(&std::fs::read(slot_file(root.path(), 0)).unwrap(), None).unwrap();
    let slot1 = save_core::open(&std::fs::read(slot_file(root.path(), 1)).unwrap(), None).unwrap();
    assert_eq!(slot0.coins, 111);
    assert_eq!(slot1.coins, 222);

    // Switching back reloads slot 0's data unchanged.
    engine.switch_slot(0).await.unwrap();
    assert_eq!(engine.coins(), 111);
}

#[tokio::test]
async fn dirty_state_is_flushed_to_the_old_slot_before_switching() {
    let root = tempfile::tempdir().unwrap();
    let engine = SaveEngine::start(test_config(root.path())).await.unwrap();

    engine.set_coins(999);
    // Still dirty: the switch itself must flush to slot 0 first.
    engine.switch_slot(1).await.unwrap();

    let slot0 = save_core::open(&std::fs::read(slot_file(root.path(), 0)).unwrap(), None).unwrap();
    assert_eq!(slot0.coins, 999);
    assert_eq!(engine.coins(), 0);
}

#[tokio::test]
async fn slot_preference_survives_restart() {
    let root = tempfile::tempdir().unwrap();

    let engine = SaveEngine::start(test_config(root.path())).await.unwrap();
    engine.switch_slot(2).await.unwrap();
    engine.shutdown().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(root.path().join("current_slot")).unwrap(),
        "2"
    );

    let engine = SaveEngine::start(test_config(root.path())).await.unwrap();
    assert_eq!(engine.active_slot(), 2);
}
