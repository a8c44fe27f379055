//! quill-crypto: the encryption collaborator.
//!
//! Documents and snapshots opt into encryption through a [`Vault`]:
//! unlock it with a passphrase, then `encrypt`/`decrypt` strings. The
//! ciphertext format is opaque to callers; they only ever see it as a
//! string to store and hand back.
//!
//! AES-256-GCM for authenticated encryption, Argon2id to derive the key
//! from the passphrase. Salt and nonce are fresh per encryption.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use rand::RngCore;
use tracing::debug;

/// Minimum passphrase length, enforced before any key derivation.
pub const MIN_PASSPHRASE_LEN: usize = 8;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const FORMAT_PREFIX: &str = "qv1";

/// Errors from vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("vault is locked and no passphrase was supplied")]
    Locked,

    #[error("passphrase must be at least {MIN_PASSPHRASE_LEN} characters")]
    PassphraseTooShort,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed (wrong passphrase or corrupted data)")]
    Decryption,

    #[error("unrecognized ciphertext format")]
    Format,
}

/// Session-scoped passphrase holder.
///
/// `unlock` keeps the passphrase for the session; `lock` drops it.
/// Each `encrypt` derives a fresh key from a fresh salt, so ciphertexts
/// are independent even under one session.
#[derive(Default)]
pub struct Vault {
    passphrase: Option<String>,
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unlock with a passphrase. Rejects short passphrases before any
    /// cryptographic work happens.
    pub fn unlock(&mut self, passphrase: &str) -> Result<(), VaultError> {
        if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
            return Err(VaultError::PassphraseTooShort);
        }
        self.passphrase = Some(passphrase.to_string());
        debug!("vault unlocked");
        Ok(())
    }

    /// Drop the session passphrase.
    pub fn lock(&mut self) {
        self.passphrase = None;
        debug!("vault locked");
    }

    pub fn is_unlocked(&self) -> bool {
        self.passphrase.is_some()
    }

    /// Encrypt with the session passphrase. Fails if locked.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let passphrase = self.passphrase.as_deref().ok_or(VaultError::Locked)?;
        encrypt_with(plaintext, passphrase)
    }

    /// Decrypt with a supplied passphrase, or the session passphrase if
    /// none is given. Fails with [`VaultError::Locked`] when neither is
    /// available.
    pub fn decrypt(
        &self,
        ciphertext: &str,
        passphrase: Option<&str>,
    ) -> Result<String, VaultError> {
        let passphrase = passphrase
            .or(self.passphrase.as_deref())
            .ok_or(VaultError::Locked)?;
        decrypt_with(ciphertext, passphrase)
    }
}

/// Is this string vault ciphertext (as opposed to plaintext content)?
pub fn looks_encrypted(s: &str) -> bool {
    s.starts_with(FORMAT_PREFIX) && s.matches(':').count() == 3
}

fn derive_key(passphrase: &str, salt: &[u8]) -> Result<[u8; 32], VaultError> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Encrypt `plaintext` under `passphrase`. Format:
/// `qv1:<b64 salt>:<b64 nonce>:<b64 ciphertext>`.
pub fn encrypt_with(plaintext: &str, passphrase: &str) -> Result<String, VaultError> {
    if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
        // Checked before anything is derived or encrypted.
        return Err(VaultError::PassphraseTooShort);
    }

    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt)?;
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|e| VaultError::Encryption(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    Ok(format!(
        "{FORMAT_PREFIX}:{}:{}:{}",
        B64.encode(salt),
        B64.encode(nonce),
        B64.encode(ciphertext)
    ))
}

/// Decrypt a `qv1` ciphertext under `passphrase`.
pub fn decrypt_with(ciphertext: &str, passphrase: &str) -> Result<String, VaultError> {
    let mut parts = ciphertext.split(':');
    if parts.next() != Some(FORMAT_PREFIX) {
        return Err(VaultError::Format);
    }
    let (salt, nonce, data) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(salt), Some(nonce), Some(data), None) => (salt, nonce, data),
        _ => return Err(VaultError::Format),
    };
    let salt = B64.decode(salt).map_err(|_| VaultError::Format)?;
    let nonce = B64.decode(nonce).map_err(|_| VaultError::Format)?;
    let data = B64.decode(data).map_err(|_| VaultError::Format)?;
    if nonce.len() != NONCE_LEN {
        return Err(VaultError::Format);
    }

    let key = derive_key(passphrase, &salt)?;
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|e| VaultError::KeyDerivation(e.to_string()))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), data.as_ref())
        .map_err(|_| VaultError::Decryption)?;
    String::from_utf8(plaintext).map_err(|_| VaultError::Decryption)
}
