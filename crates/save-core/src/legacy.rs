//! First-run import from the legacy flat key-value store.
//!
//! Older installs kept progress as individual preference entries
//! instead of one save file. The engine consults this store exactly
//! once, when no save file exists, then persists the imported record
//! so subsequent loads use the envelope format exclusively.

use crate::migrate::CURRENT_VERSION;
use crate::record::{SaveRecord, clamp_non_negative};

/// Well-known keys in the legacy store.
pub mod keys {
    pub const COINS: &str = "coins";
    pub const HIGH_SCORE: &str = "highScore";
    pub const TUTORIAL_SEEN: &str = "tutorialSeen";
    /// Per-upgrade entries are stored as `upgrade_<id>`.
    pub const UPGRADE_PREFIX: &str = "upgrade_";
}

/// Read access to the legacy flat key-value store.
pub trait LegacyStore: Send + Sync {
    /// Fetch an integer entry, returning `default` when absent.
    fn get_int(&self, key: &str, default: i64) -> i64;

    /// All keys present in the store.
    fn keys(&self) -> Vec<String>;
}

/// Populate a fresh record at the current schema version from legacy
/// entries. Values are clamped to the record invariants.
pub fn import(store: &dyn LegacyStore) -> SaveRecord {
    let mut record = SaveRecord {
        version: CURRENT_VERSION,
        coins: clamp_non_negative(store.get_int(keys::COINS, 0)),
        high_score: clamp_non_negative(store.get_int(keys::HIGH_SCORE, 0)),
        tutorial_completed: store.get_int(keys::TUTORIAL_SEEN, 0) != 0,
        ..SaveRecord::default()
    };

    for key in store.keys() {
        if let Some(id) = key.strip_prefix(keys::UPGRADE_PREFIX)
            && !id.is_empty()
        {
            let level = clamp_non_negative(store.get_int(&key, 0)) as u32;
            record.upgrades.set_level(id, level);
        }
    }

    record
}

/// HashMap-backed store for tests and embedders without a real
/// legacy preference backend.
#[derive(Debug, Default)]
pub struct MemoryLegacyStore {
    entries: std::collections::HashMap<String, i64>,
}

impl MemoryLegacyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: i64) -> Self {
        self.entries.insert(key.into(), value);
        self
    }
}

impl LegacyStore for MemoryLegacyStore {
    fn get_int(&self, key: &str, default: i64) -> i64 {
        self.entries.get(key).copied().unwrap_or(default)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
