//! Unified error types surfaced by the persistence engine.
//!
//! Invalid-argument conditions (bad file names, bad slot indices) fail
//! fast and synchronously; disk-related conditions are handled inside
//! the engine and logged rather than propagated to callers.

use thiserror::Error;

pub use save_core::EnvelopeError;

pub type Result<T> = std::result::Result<T, SaveError>;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("invalid save file name: {0:?}")]
    InvalidFileName(String),

    #[error("slot index {index} out of range ({max} slots)")]
    SlotOutOfRange { index: u8, max: u8 },

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background writer channel closed")]
    WriterChannelClosed,
}
