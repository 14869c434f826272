//! Writer failure handling: bounded retries, dirty-flag recovery, and
//! the bounded shutdown wait.

use std::path::Path;
use std::time::{Duration, Instant};

use save_engine::{EngineConfig, SaveEngine};

async fn eventually(mut cond: impl FnMut() -> bool, what: &str) {
    for _ in 0..300 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn failing_write_is_retried_exactly_max_attempts_then_abandoned() {
    let root = tempfile::tempdir().unwrap();
    let config = EngineConfig::new(root.path())
        // Long debounce keeps the second autosave cycle out of the
        // assertion window.
        .with_debounce(Duration::from_millis(500))
        .with_retry_delay(Duration::from_millis(10))
        .with_max_write_attempts(3);

    let engine = SaveEngine::start(config).await.unwrap();
    engine.flush().await.unwrap();
    let before = engine.metrics();

    // Block the save path with a directory so every rename fails.
    let path = root.path().join("slot_0").join("savegame.json");
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    engine.set_coins(42);
    eventually(
        || engine.metrics().dropped_writes == before.dropped_writes + 1,
        "write abandoned",
    )
    .await;

    let m = engine.metrics();
    assert_eq!(m.failed_write_attempts, before.failed_write_attempts + 3);
    assert_eq!(m.retries, before.retries + 2);
    // The abandoned data is not lost: the record is dirty again.
    assert!(engine.is_dirty());

    // Once the disk recovers, the dirty flag drives a fresh attempt.
    std::fs::remove_dir(&path).unwrap();
    eventually(
        || !engine.is_dirty() && engine.metrics().completed_writes > before.completed_writes,
        "recovery write",
    )
    .await;

    engine.flush().await.unwrap();
    let record = save_core::open(&std::fs::read(&path).unwrap(), None).unwrap();
    assert_eq!(record.coins, 42);
}

#[tokio::test]
async fn shutdown_wait_is_bounded_when_the_disk_stays_broken() {
    let root = tempfile::tempdir().unwrap();
    let config = EngineConfig::new(root.path())
        .with_debounce(Duration::from_millis(10))
        .with_retry_delay(Duration::from_millis(100))
        .with_max_write_attempts(100)
        .with_shutdown_timeout(Duration::from_millis(200));

    let engine = SaveEngine::start(config).await.unwrap();
    engine.flush().await.unwrap();

    block_save_path(root.path());
    engine.set_coins(1);
    eventually(
        || engine.metrics().failed_write_attempts >= 1,
        "first failed write",
    )
    .await;

    // The writer keeps retrying, but shutdown must not wait for it.
    let started = Instant::now();
    engine.shutdown().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
}

fn block_save_path(root: &Path) {
    let path = root.join("slot_0").join("savegame.json");
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();
}
