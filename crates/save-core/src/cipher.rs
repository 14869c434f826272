//! Optional AES-256-CBC encryption for save payloads.
//!
//! Secrets arrive as base64 text (a 256-bit key and a 128-bit IV),
//! typically from the process environment. A missing or invalid secret
//! disables encryption at the engine level; it never fails a save.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::{EnvelopeError, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// AES-256-CBC cipher with PKCS7 padding.
#[derive(Clone)]
pub struct SaveCipher {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl std::fmt::Debug for SaveCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets stay out of logs.
        f.debug_struct("SaveCipher").finish_non_exhaustive()
    }
}

impl SaveCipher {
    /// Build a cipher from base64-encoded secrets.
    ///
    /// The key must decode to 32 bytes and the IV to 16.
    pub fn from_base64(key_b64: &str, iv_b64: &str) -> Result<Self> {
        let key_bytes = BASE64
            .decode(key_b64.trim())
            .map_err(|e| EnvelopeError::InvalidSecret(format!("key is not valid base64: {e}")))?;
        let iv_bytes = BASE64
            .decode(iv_b64.trim())
            .map_err(|e| EnvelopeError::InvalidSecret(format!("IV is not valid base64: {e}")))?;

        let key: [u8; KEY_LEN] = key_bytes.try_into().map_err(|bytes: Vec<u8>| {
            EnvelopeError::InvalidSecret(format!(
                "key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        let iv: [u8; IV_LEN] = iv_bytes.try_into().map_err(|bytes: Vec<u8>| {
            EnvelopeError::InvalidSecret(format!("IV must be {IV_LEN} bytes, got {}", bytes.len()))
        })?;

        Ok(Self { key, iv })
    }

    /// Encrypt a plaintext payload.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        Aes256CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    /// Decrypt a ciphertext payload.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|e| EnvelopeError::DecryptFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> SaveCipher {
        SaveCipher::from_base64(&BASE64.encode([7u8; 32]), &BASE64.encode([9u8; 16])).unwrap()
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let cipher = test_cipher();
        let plain = b"{\"coins\":42}";
        let ct = cipher.encrypt(plain);
        assert_ne!(&ct[..plain.len().min(ct.len())], &plain[..]);
        assert_eq!(cipher.decrypt(&ct).unwrap(), plain);
    }

    #[test]
    fn rejects_wrong_key_length() {
        let err = SaveCipher::from_base64(&BASE64.encode([1u8; 16]), &BASE64.encode([2u8; 16]))
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidSecret(_)));
    }

    #[test]
    fn rejects_non_base64_secret() {
        let err = SaveCipher::from_base64("not base64!!!", &BASE64.encode([2u8; 16])).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidSecret(_)));
    }

    #[test]
    fn truncated_ciphertext_fails_to_decrypt() {
        let cipher = test_cipher();
        let mut ct = cipher.encrypt(b"payload");
        ct.truncate(ct.len() - 1);
        let err = cipher.decrypt(&ct);
        assert!(matches!(err, Err(EnvelopeError::DecryptFailed(_))));
    }
}
