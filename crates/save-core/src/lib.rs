//! Core save-data model: the persisted record, its schema migration
//! ladder, and the checksummed (optionally encrypted) on-disk
//! envelope.
//!
//! This crate is deliberately free of async and file I/O so the data
//! contracts stay testable in isolation; the `save-engine` crate owns
//! the write pipeline.
//!
//! Modules are organized by responsibility:
//! - [`record`] defines [`SaveRecord`] and its field invariants
//! - [`migrate`] upgrades older records to the current schema
//! - [`envelope`] seals records with an integrity checksum and
//!   optional AES-256-CBC encryption
//! - [`cipher`] holds the encryption primitive and secret parsing
//! - [`legacy`] imports progress from the old flat key-value store

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod legacy;
pub mod migrate;
pub mod record;

pub use cipher::SaveCipher;
pub use envelope::{SaveEnvelope, open, seal};
pub use error::EnvelopeError;
pub use legacy::{LegacyStore, MemoryLegacyStore};
pub use migrate::{CURRENT_VERSION, migrate};
pub use record::{DEFAULT_LANGUAGE, SaveRecord, Upgrades};
