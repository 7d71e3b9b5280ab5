//! Symmetric encryption for stored provider API keys.
//!
//! BYOK keys are encrypted at rest with AES-256-GCM under a process-wide
//! secret (`ENCRYPTION_SECRET`, 64 hex characters = 32 bytes). The stored
//! format is a hex composite of the random nonce, the authentication tag
//! and the ciphertext, joined by `:`:
//!
//! ```text
//! <nonce_hex>:<tag_hex>:<ciphertext_hex>
//! ```
//!
//! Decryption fails closed: any tampering, truncation or wrong secret
//! produces an error, never garbage plaintext.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};

/// AES-GCM nonce length in bytes.
const NONCE_LENGTH: usize = 12;

/// AES-GCM authentication tag length in bytes.
const TAG_LENGTH: usize = 16;

/// Errors from encrypting or decrypting stored key material.
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    /// The configured secret is not a 64-character hex string.
    #[error("encryption secret must be a 32-byte hex string (64 hex characters)")]
    InvalidSecret,

    /// The stored value does not have the `nonce:tag:ciphertext` shape,
    /// or one of the parts is not valid hex.
    #[error("invalid encrypted value format, expected 'nonce:tag:ciphertext'")]
    InvalidFormat,

    /// Nonce or tag has the wrong byte length.
    #[error("invalid {part} length: expected {expected}, got {got}")]
    InvalidLength {
        part: &'static str,
        expected: usize,
        got: usize,
    },

    /// Authenticated decryption failed (wrong secret or tampered data).
    #[error("decryption failed: ciphertext could not be authenticated")]
    DecryptFailed,

    /// Encryption itself failed. Should not happen with valid inputs.
    #[error("encryption failed")]
    EncryptFailed,

    /// Decrypted bytes are not valid UTF-8.
    #[error("decrypted data is not valid UTF-8")]
    InvalidUtf8,
}

/// Cipher wrapper bound to the process-wide key-encryption secret.
pub struct KeyCipher {
    cipher: Aes256Gcm,
}

impl KeyCipher {
    /// Build a cipher from a 64-character hex secret.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::InvalidSecret`] if the secret is not
    /// exactly 32 bytes of hex.
    pub fn from_hex_secret(secret: &str) -> Result<Self, EncryptionError> {
        if secret.len() != 64 {
            return Err(EncryptionError::InvalidSecret);
        }

        let key_bytes = hex::decode(secret).map_err(|_| EncryptionError::InvalidSecret)?;
        if key_bytes.len() != 32 {
            return Err(EncryptionError::InvalidSecret);
        }

        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Encrypt a plaintext key into the `nonce:tag:ciphertext` hex composite.
    ///
    /// A fresh random nonce is generated per call, so encrypting the same
    /// plaintext twice yields different stored values.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let nonce_bytes: [u8; NONCE_LENGTH] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        // aes-gcm appends the 16-byte tag to the ciphertext; split it off so
        // the stored composite keeps the tag as its own segment.
        let mut sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError::EncryptFailed)?;

        let tag = sealed.split_off(sealed.len() - TAG_LENGTH);

        Ok(format!(
            "{}:{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(tag),
            hex::encode(sealed)
        ))
    }

    /// Decrypt a stored `nonce:tag:ciphertext` composite back to plaintext.
    ///
    /// # Errors
    ///
    /// Fails closed on malformed input, wrong lengths, a wrong secret or any
    /// bit of tampering in nonce, tag or ciphertext.
    pub fn decrypt(&self, stored: &str) -> Result<String, EncryptionError> {
        let parts: Vec<&str> = stored.split(':').collect();
        if parts.len() != 3 {
            return Err(EncryptionError::InvalidFormat);
        }

        let nonce_bytes = hex::decode(parts[0]).map_err(|_| EncryptionError::InvalidFormat)?;
        let tag = hex::decode(parts[1]).map_err(|_| EncryptionError::InvalidFormat)?;
        let ciphertext = hex::decode(parts[2]).map_err(|_| EncryptionError::InvalidFormat)?;

        if nonce_bytes.len() != NONCE_LENGTH {
            return Err(EncryptionError::InvalidLength {
                part: "nonce",
                expected: NONCE_LENGTH,
                got: nonce_bytes.len(),
            });
        }
        if tag.len() != TAG_LENGTH {
            return Err(EncryptionError::InvalidLength {
                part: "tag",
                expected: TAG_LENGTH,
                got: tag.len(),
            });
        }

        // Recombine ciphertext || tag into the layout aes-gcm expects.
        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let nonce = Nonce::from_slice(&nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, sealed.as_ref())
            .map_err(|_| EncryptionError::DecryptFailed)?;

        String::from_utf8(plaintext).map_err(|_| EncryptionError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> KeyCipher {
        KeyCipher::from_hex_secret(&"ab".repeat(32)).unwrap()
    }

    #[test]
    fn round_trip_recovers_plaintext() {
        let cipher = test_cipher();

        let stored = cipher.encrypt("sk-live-1234567890").unwrap();
        assert_eq!(cipher.decrypt(&stored).unwrap(), "sk-live-1234567890");
    }

    #[test]
    fn fresh_nonce_per_encryption() {
        let cipher = test_cipher();

        let a = cipher.encrypt("same-key").unwrap();
        let b = cipher.encrypt("same-key").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn corrupted_ciphertext_fails_closed() {
        let cipher = test_cipher();
        let stored = cipher.encrypt("secret-key").unwrap();

        // Flip one hex digit in the ciphertext segment.
        let mut parts: Vec<String> = stored.split(':').map(String::from).collect();
        let last = parts[2].pop().unwrap();
        parts[2].push(if last == '0' { '1' } else { '0' });
        let tampered = parts.join(":");

        assert!(matches!(
            cipher.decrypt(&tampered),
            Err(EncryptionError::DecryptFailed)
        ));
    }

    #[test]
    fn corrupted_tag_fails_closed() {
        let cipher = test_cipher();
        let stored = cipher.encrypt("secret-key").unwrap();

        let mut parts: Vec<String> = stored.split(':').map(String::from).collect();
        let first = parts[1].remove(0);
        parts[1].insert(0, if first == 'f' { '0' } else { 'f' });
        let tampered = parts.join(":");

        assert!(cipher.decrypt(&tampered).is_err());
    }

    #[test]
    fn wrong_secret_fails_closed() {
        let stored = test_cipher().encrypt("secret-key").unwrap();

        let other = KeyCipher::from_hex_secret(&"cd".repeat(32)).unwrap();
        assert!(matches!(
            other.decrypt(&stored),
            Err(EncryptionError::DecryptFailed)
        ));
    }

    #[test]
    fn malformed_composite_rejected() {
        let cipher = test_cipher();

        assert!(matches!(
            cipher.decrypt("not-an-encrypted-value"),
            Err(EncryptionError::InvalidFormat)
        ));
        assert!(matches!(
            cipher.decrypt("aa:bb"),
            Err(EncryptionError::InvalidFormat)
        ));
        assert!(matches!(
            cipher.decrypt("zz:zz:zz"),
            Err(EncryptionError::InvalidFormat)
        ));
        // Valid hex but wrong nonce length.
        assert!(matches!(
            cipher.decrypt("aabb:00112233445566778899aabbccddeeff:00"),
            Err(EncryptionError::InvalidLength { part: "nonce", .. })
        ));
    }

    #[test]
    fn secret_must_be_64_hex_chars() {
        assert!(KeyCipher::from_hex_secret("short").is_err());
        assert!(KeyCipher::from_hex_secret(&"g".repeat(64)).is_err());
        assert!(KeyCipher::from_hex_secret(&"ab".repeat(32)).is_ok());
    }
}
