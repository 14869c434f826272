//! Error types raised by envelope and cipher operations.

use thiserror::Error;

/// Errors surfaced while sealing or opening a save envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch { stored: String, computed: String },

    #[error("save is encrypted but no cipher is configured")]
    DecryptionUnavailable,

    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("invalid encryption secret: {0}")]
    InvalidSecret(String),

    #[error("decryption failed: {0}")]
    DecryptFailed(String),
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
