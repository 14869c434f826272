//! Engine configuration structures and loaders.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::{env, fmt};

use directories::ProjectDirs;
use tracing::{debug, warn};

use save_core::{LegacyStore, SaveCipher};

/// Environment variable overriding the save data root directory.
pub const ENV_DATA_DIR: &str = "SAVE_DATA_DIR";
/// Environment variable carrying the base64 256-bit encryption key.
pub const ENV_ENCRYPTION_KEY: &str = "SAVE_ENCRYPTION_KEY";
/// Environment variable carrying the base64 128-bit initialization vector.
pub const ENV_ENCRYPTION_IV: &str = "SAVE_ENCRYPTION_IV";

/// Default save file name inside each slot directory.
pub const DEFAULT_SAVE_FILE: &str = "savegame.json";
/// Default number of independent save slots.
pub const DEFAULT_MAX_SLOTS: u8 = 3;

/// Configuration for [`SaveEngine`](crate::SaveEngine).
///
/// The timing values are tunables, not fixed law: debounce bounds how
/// often dirty state is flushed, `max_write_attempts` bounds retries of
/// a single queued write, and `shutdown_timeout` bounds how long exit
/// waits for the writer to drain.
#[derive(Clone)]
pub struct EngineConfig {
    /// Root directory holding the slot directories and slot preference.
    pub root_dir: PathBuf,

    /// Save file name resolved inside the active slot directory.
    pub save_file: String,

    /// Number of independent save slots.
    pub max_slots: u8,

    /// Minimum interval between successive autosave flushes.
    pub debounce: Duration,

    /// Maximum write attempts per queued save before it is dropped.
    pub max_write_attempts: u32,

    /// Base delay before a write retry; doubled per attempt.
    pub retry_delay: Duration,

    /// Bound on the shutdown wait for pending writes.
    pub shutdown_timeout: Duration,

    /// Optional payload encryption; `None` writes plaintext envelopes.
    pub cipher: Option<SaveCipher>,

    /// Legacy key-value store consulted once when no save file exists.
    pub legacy: Option<Arc<dyn LegacyStore>>,
}

impl EngineConfig {
    /// Create a configuration with default tunables for a root directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            save_file: DEFAULT_SAVE_FILE.to_string(),
            max_slots: DEFAULT_MAX_SLOTS,
            debounce: Duration::from_secs(2),
            max_write_attempts: 3,
            retry_delay: Duration::from_millis(100),
            shutdown_timeout: Duration::from_secs(2),
            cipher: None,
            legacy: None,
        }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `SAVE_DATA_DIR` - Root directory for save data (default:
    ///   platform-specific data dir)
    /// - `SAVE_ENCRYPTION_KEY` - base64 256-bit AES key (optional)
    /// - `SAVE_ENCRYPTION_IV` - base64 128-bit IV (optional)
    ///
    /// A missing or invalid secret disables encryption with a warning
    /// rather than failing startup.
    pub fn from_env() -> Self {
        let root_dir = env::var(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        Self {
            cipher: cipher_from_env(),
            ..Self::new(root_dir)
        }
    }

    pub fn with_save_file(mut self, save_file: impl Into<String>) -> Self {
        self.save_file = save_file.into();
        self
    }

    pub fn with_max_slots(mut self, max_slots: u8) -> Self {
        self.max_slots = max_slots.max(1);
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_write_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_cipher(mut self, cipher: SaveCipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn with_legacy_store(mut self, store: Arc<dyn LegacyStore>) -> Self {
        self.legacy = Some(store);
        self
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("root_dir", &self.root_dir)
            .field("save_file", &self.save_file)
            .field("max_slots", &self.max_slots)
            .field("debounce", &self.debounce)
            .field("max_write_attempts", &self.max_write_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("encrypted", &self.cipher.is_some())
            .field("legacy", &self.legacy.is_some())
            .finish()
    }
}

/// Platform data directory for the game, falling back to the current
/// directory when the platform provides none.
fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "endless-runner")
        .map(|dirs| dirs.data_dir().join("saves"))
        .unwrap_or_else(|| PathBuf::from("saves"))
}

/// Read encryption secrets from the environment.
///
/// Both values must be present and valid for encryption to be enabled.
fn cipher_from_env() -> Option<SaveCipher> {
    let key = env::var(ENV_ENCRYPTION_KEY).ok();
    let iv = env::var(ENV_ENCRYPTION_IV).ok();

    match (key, iv) {
        (Some(key), Some(iv)) => match SaveCipher::from_base64(&key, &iv) {
            Ok(cipher) => Some(cipher),
            Err(e) => {
                warn!("invalid encryption secrets, saves will be plaintext: {e}");
                None
            }
        },
        (None, None) => {
            debug!("encryption secrets not set, saves will be plaintext");
            None
        }
        _ => {
            warn!(
                "only one of {ENV_ENCRYPTION_KEY}/{ENV_ENCRYPTION_IV} is set, \
                 saves will be plaintext"
            );
            None
        }
    }
}
