//! Account signing identity (Ed25519)
//!
//! The secret seed doubles as the input key material for the account's
//! entry encryption keys, see [`crate::crypto::EntryKeys`].

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::StoreError;

/// Length of an Ed25519 public key in bytes
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of an Ed25519 signature in bytes
pub const SIGNATURE_LEN: usize = 64;

/// Ed25519 keypair owned by an account holder.
pub struct AccountKeypair {
    signing: SigningKey,
}

impl AccountKeypair {
    /// Generate a new random keypair.
    pub fn generate() -> Result<Self, StoreError> {
        // getrandom directly, to stay clear of rand_core version mismatches
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed)
            .map_err(|e| StoreError::Crypto(format!("No entropy available: {}", e)))?;
        Ok(Self::from_seed(&seed))
    }

    /// Deterministic keypair from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// Secret seed. Handle with care.
    pub fn secret_bytes(&self) -> &[u8; 32] {
        self.signing.as_bytes()
    }

    pub fn public_key(&self) -> AccountPublicKey {
        AccountPublicKey(self.signing.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing.sign(message).to_bytes()
    }
}

impl Clone for AccountKeypair {
    fn clone(&self) -> Self {
        Self::from_seed(self.signing.as_bytes())
    }
}

impl std::fmt::Debug for AccountKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountKeypair")
            .field("public", &self.public_key().to_hex())
            .finish_non_exhaustive()
    }
}

/// Public half of an [`AccountKeypair`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountPublicKey(VerifyingKey);

impl AccountPublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        let arr: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| {
            StoreError::SignatureInvalid(format!(
                "public key must be {} bytes, got {}",
                PUBLIC_KEY_LEN,
                bytes.len()
            ))
        })?;
        VerifyingKey::from_bytes(&arr)
            .map(Self)
            .map_err(|e| StoreError::SignatureInvalid(format!("Invalid public key: {}", e)))
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// Verify a detached signature.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), StoreError> {
        let sig = Signature::from_slice(signature).map_err(|e| {
            StoreError::SignatureInvalid(format!("Malformed signature: {}", e))
        })?;
        self.0
            .verify(message, &sig)
            .map_err(|_| StoreError::SignatureInvalid("verification failed".to_string()))
    }
}
