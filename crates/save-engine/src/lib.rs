//! Asynchronous, crash-safe persistence engine for player save data.
//!
//! This crate wires the save-data model from `save-core` into a write
//! pipeline: typed accessors mark an in-memory record dirty, a
//! debounced autosave loop serializes it into a checksummed
//! (optionally encrypted) envelope, and a single background writer
//! task performs atomic temp-file-then-rename writes with bounded
//! retries. Slot selection, corruption recovery, and first-run legacy
//! import are handled internally; disk failures never unwind into
//! callers.
//!
//! Modules are organized by responsibility:
//! - [`engine`] hosts [`SaveEngine`], the collaborator-facing handle
//! - [`config`] loads engine tunables and encryption secrets
//! - [`slot`] resolves slot directories and the slot preference
//! - [`workers`] keeps the autosave and writer tasks internal
//!
//! ```no_run
//! use save_engine::{EngineConfig, SaveEngine};
//!
//! # async fn demo() -> save_engine::Result<()> {
//! let engine = SaveEngine::start(EngineConfig::from_env()).await?;
//! engine.set_coins(engine.coins() as i64 + 10);
//! engine.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod slot;

mod error;
mod workers;

pub use config::EngineConfig;
pub use engine::SaveEngine;
pub use error::{Result, SaveError};
pub use slot::{SlotLocator, SlotPreference};
pub use workers::MetricsSnapshot;

// Re-export the data-model surface collaborators need.
pub use save_core::{
    CURRENT_VERSION, DEFAULT_LANGUAGE, LegacyStore, MemoryLegacyStore, SaveCipher, SaveRecord,
    Upgrades,
};
