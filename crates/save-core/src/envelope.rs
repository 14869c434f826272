//! On-disk envelope: integrity checksum plus optional encryption.
//!
//! The checksum always covers the transmitted payload bytes: the raw
//! ciphertext when encryption is enabled, otherwise the serialized
//! record JSON exactly as it sits in the file. Plaintext payloads are
//! embedded through [`RawValue`] so the digested bytes and the written
//! bytes are identical.
//!
//! # File Format
//!
//! ```text
//! {"checksum": "<hex sha-256>", "encrypted": false, "data": {...}}
//! {"checksum": "<hex sha-256>", "encrypted": true,  "payload": "<base64>"}
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};

use crate::cipher::SaveCipher;
use crate::error::{EnvelopeError, Result};
use crate::record::SaveRecord;

/// Wire form of a saved record.
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveEnvelope {
    /// Hex SHA-256 of the payload bytes.
    pub checksum: String,
    pub encrypted: bool,
    /// Plain serialized record (absent when encrypted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<RawValue>>,
    /// Base64 ciphertext (present only when encrypted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Serialize a record into envelope bytes ready for disk.
pub fn seal(record: &SaveRecord, cipher: Option<&SaveCipher>) -> Result<Vec<u8>> {
    let plain = serde_json::to_vec(record).map_err(|e| EnvelopeError::Json(e.to_string()))?;

    let envelope = match cipher {
        Some(cipher) => {
            let ciphertext = cipher.encrypt(&plain);
            SaveEnvelope {
                checksum: digest_hex(&ciphertext),
                encrypted: true,
                data: None,
                payload: Some(BASE64.encode(&ciphertext)),
            }
        }
        None => {
            let text =
                String::from_utf8(plain).map_err(|e| EnvelopeError::Json(e.to_string()))?;
            let raw =
                RawValue::from_string(text).map_err(|e| EnvelopeError::Json(e.to_string()))?;
            SaveEnvelope {
                checksum: digest_hex(raw.get().as_bytes()),
                encrypted: false,
                data: Some(raw),
                payload: None,
            }
        }
    };

    serde_json::to_vec(&envelope).map_err(|e| EnvelopeError::Json(e.to_string()))
}

/// Parse envelope bytes back into a record, verifying the checksum.
///
/// Does not run migration; callers upgrade the record afterwards.
pub fn open(bytes: &[u8], cipher: Option<&SaveCipher>) -> Result<SaveRecord> {
    let envelope: SaveEnvelope =
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Json(e.to_string()))?;

    if envelope.encrypted {
        let payload = envelope
            .payload
            .as_deref()
            .ok_or_else(|| EnvelopeError::Malformed("encrypted envelope without payload".into()))?;
        let ciphertext = BASE64
            .decode(payload)
            .map_err(|e| EnvelopeError::Malformed(format!("payload is not valid base64: {e}")))?;
        verify_checksum(&envelope.checksum, &ciphertext)?;

        let cipher = cipher.ok_or(EnvelopeError::DecryptionUnavailable)?;
        let plain = cipher.decrypt(&ciphertext)?;
        serde_json::from_slice(&plain).map_err(|e| EnvelopeError::Json(e.to_string()))
    } else {
        let data = envelope
            .data
            .as_deref()
            .ok_or_else(|| EnvelopeError::Malformed("plain envelope without data".into()))?;
        verify_checksum(&envelope.checksum, data.get().as_bytes())?;
        serde_json::from_str(data.get()).map_err(|e| EnvelopeError::Json(e.to_string()))
    }
}

fn verify_checksum(stored: &str, payload: &[u8]) -> Result<()> {
    let computed = digest_hex(payload);
    if computed != stored.to_ascii_lowercase() {
        return Err(EnvelopeError::ChecksumMismatch {
            stored: stored.to_string(),
            computed,
        });
    }
    Ok(())
}

fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
