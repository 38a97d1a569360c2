//! Entry encryption using ChaCha20-Poly1305 AEAD
//!
//! Keys are derived in two steps with HKDF-SHA256:
//! 1. Extract, once per account: salt = account id, input = the account's
//!    secret seed. This is [`EntryKeys`].
//! 2. Expand, per entry: info = `"syncstore/entry/v1" || path hash`.
//!
//! A sealed value therefore only decrypts at the path it was written to.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;

use crate::error::StoreError;
use crate::identity::AccountKeypair;
use crate::types::{AccountId, PathHash};

/// Nonce size for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag size
pub const TAG_SIZE: usize = 16;

const ENTRY_KEY_INFO: &[u8] = b"syncstore/entry/v1";

/// Account-wide key material from which per-entry keys are expanded.
#[derive(Clone)]
pub struct EntryKeys {
    hkdf: Hkdf<Sha256>,
}

impl EntryKeys {
    /// Derive the account's key material from its signing seed.
    pub fn derive(account: &AccountId, keypair: &AccountKeypair) -> Self {
        Self {
            hkdf: Hkdf::<Sha256>::new(Some(account.as_bytes()), keypair.secret_bytes()),
        }
    }

    /// Cipher for the entry stored at `path`.
    pub fn cipher_for(&self, path: &PathHash) -> Result<EntryCipher, StoreError> {
        let mut info = Vec::with_capacity(ENTRY_KEY_INFO.len() + path.as_bytes().len());
        info.extend_from_slice(ENTRY_KEY_INFO);
        info.extend_from_slice(path.as_bytes());

        let mut key = [0u8; 32];
        self.hkdf
            .expand(&info, &mut key)
            .map_err(|e| StoreError::Crypto(format!("Key derivation failed: {}", e)))?;
        Ok(EntryCipher::new(&key))
    }
}

impl std::fmt::Debug for EntryKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryKeys").finish_non_exhaustive()
    }
}

/// Symmetric cipher for one entry.
///
/// # Wire Format
///
/// Encrypted data format: `[nonce (12 bytes)] + [ciphertext + auth_tag (16 bytes)]`
pub struct EntryCipher {
    cipher: ChaCha20Poly1305,
}

impl EntryCipher {
    /// Create a cipher with the given 32-byte key.
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(key.into()),
        }
    }

    /// Encrypt with a fresh random nonce, prepended to the output.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| StoreError::Crypto(format!("Encryption failed: {}", e)))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt `[nonce] + [ciphertext + tag]`.
    ///
    /// Fails on a wrong key, any tampering, or input too short to hold a
    /// nonce and tag. Never returns partially decrypted data.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, StoreError> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(StoreError::DecryptionFailed(
                "Data too short to contain nonce and tag".to_string(),
            ));
        }

        let (nonce, encrypted) = data.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), encrypted)
            .map_err(|e| StoreError::DecryptionFailed(format!("{}", e)))
    }
}
