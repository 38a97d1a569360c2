//! Core types for the account store

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Length in bytes of account identifiers and path hashes
pub const HASH_LEN: usize = 32;

fn parse_hex_32(kind: &str, s: &str) -> Result<[u8; HASH_LEN], StoreError> {
    if s.len() != HASH_LEN * 2 {
        return Err(StoreError::InvalidInput(format!(
            "{} must be {} hex characters, got {}",
            kind,
            HASH_LEN * 2,
            s.len()
        )));
    }
    let bytes = hex::decode(s)
        .map_err(|e| StoreError::InvalidInput(format!("{} is not valid hex: {}", kind, e)))?;
    let mut arr = [0u8; HASH_LEN];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// Opaque identifier of an account.
///
/// Handed in by whoever authenticated the caller; the store only uses it to
/// pick the account's storage file and to salt path hashes and keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub [u8; HASH_LEN]);

impl AccountId {
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, StoreError> {
        parse_hex_32("account id", s).map(Self)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for AccountId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Content address of one entry: `SHA-256(account || logical path)`.
///
/// See [`crate::path::hash`]. The engine never reverses or parses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathHash(pub [u8; HASH_LEN]);

impl PathHash {
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, StoreError> {
        parse_hex_32("path hash", s).map(Self)
    }
}

impl std::fmt::Display for PathHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for PathHash {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// One node of an account's tree, as written by callers and returned by reads.
///
/// On write only `path`, `parent`, `data`, `signature` and `public_key` are
/// taken into account; the store stamps `timestamp` itself and keeps track of
/// children on its own.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Entry {
    /// Own path hash (primary key)
    pub path: PathHash,
    /// Parent path hash, `None` only for the root entry
    pub parent: Option<PathHash>,
    /// Sealed value (ciphertext), empty for bare collections
    pub data: Vec<u8>,
    /// Unix seconds of the last change to this entry or any descendant
    pub timestamp: i64,
    /// Whether the node has at least one child
    pub has_children: bool,
    /// Materialized children, only filled by recursive reads
    pub children: Vec<Entry>,
    /// Signature over path, parent and data
    pub signature: Vec<u8>,
    /// Public key the signature verifies against
    pub public_key: Vec<u8>,
    /// Set on nodes skipped by a `since` read: only `path`, `parent`,
    /// `timestamp` and `has_children` are meaningful
    pub unchanged: bool,
}

impl Default for PathHash {
    fn default() -> Self {
        Self([0u8; HASH_LEN])
    }
}

impl Entry {
    /// Create an entry to be written at `path` under `parent`.
    pub fn new(path: PathHash, parent: Option<PathHash>, data: Vec<u8>) -> Self {
        Self {
            path,
            parent,
            data,
            ..Default::default()
        }
    }

    /// Attach the signature and signer public key.
    pub fn with_signature(mut self, signature: Vec<u8>, public_key: Vec<u8>) -> Self {
        self.signature = signature;
        self.public_key = public_key;
        self
    }

    /// Whether the entry carries neither value nor signature.
    ///
    /// The auto-created root and collections that never got a value are bare.
    pub fn is_bare(&self) -> bool {
        self.data.is_empty() && self.signature.is_empty()
    }

    /// Depth-first iterator over this entry and all materialized descendants.
    pub fn walk(&self) -> impl Iterator<Item = &Entry> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }
}
