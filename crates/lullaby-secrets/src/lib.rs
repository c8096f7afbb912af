//! Credential-at-rest encryption for the Lullaby platform.
//!
//! User-supplied provider API keys are encrypted with AES-256-GCM before
//! they touch the database. The cipher key is derived once per process by
//! hashing a configured secret with SHA-256; each encryption uses a fresh
//! random 12-byte nonce, stored alongside the ciphertext.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use lullaby_types::EncryptedCredential;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 12;

/// Errors from credential encryption/decryption.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    #[error("credential encryption failed")]
    Encrypt,

    /// Wrong key, truncated nonce, or tampered ciphertext.
    #[error("credential decryption failed")]
    Decrypt,
}

/// Process-wide credential cipher.
///
/// Cheap to clone; holds only the derived 32-byte key.
#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; 32],
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

impl SecretCipher {
    /// Derives the cipher key from a configured process-wide secret.
    pub fn from_secret(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Encrypts a plaintext API key with a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedCredential, SecretError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| SecretError::Encrypt)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| SecretError::Encrypt)?;

        Ok(EncryptedCredential {
            ciphertext,
            nonce: nonce_bytes.to_vec(),
        })
    }

    /// Decrypts a stored credential back to the plaintext API key.
    pub fn decrypt(&self, credential: &EncryptedCredential) -> Result<String, SecretError> {
        if credential.nonce.len() != NONCE_LEN {
            return Err(SecretError::Decrypt);
        }
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| SecretError::Decrypt)?;
        let nonce = Nonce::from_slice(&credential.nonce);

        let plaintext = cipher
            .decrypt(nonce, credential.ciphertext.as_ref())
            .map_err(|_| SecretError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| SecretError::Decrypt)
    }
}
