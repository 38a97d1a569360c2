//! Sealed entry envelopes
//!
//! Values never reach the store in plaintext. Before a write the client
//! seals the value, after a read it opens it again.
//!
//! ## Security Model
//!
//! Uses **Encrypt-then-Sign**:
//! 1. Encrypt the value with the entry's key (ChaCha20-Poly1305, see
//!    [`crate::crypto`])
//! 2. Sign `SHA-256(domain || path || parent? || ciphertext)` with the
//!    account's Ed25519 key
//! 3. Ship the public key next to the signature
//!
//! Opening checks the signature first, and only then decrypts. Both a bad
//! signature and a failed AEAD tag are hard errors. The signature binds the
//! ciphertext to its position in the tree, so the store cannot swap values
//! between entries or hang an entry under another parent.

use sha2::{Digest, Sha256};

use crate::crypto::EntryKeys;
use crate::error::StoreError;
use crate::identity::{AccountKeypair, AccountPublicKey};
use crate::path;
use crate::types::{AccountId, Entry, PathHash};

const SIGNATURE_DOMAIN: &[u8] = b"syncstore/sig/v1";

/// Digest covered by an entry's signature.
pub fn signing_digest(path: &PathHash, parent: Option<&PathHash>, data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(SIGNATURE_DOMAIN);
    hasher.update(path.as_bytes());
    match parent {
        Some(parent) => {
            hasher.update([1u8]);
            hasher.update(parent.as_bytes());
        }
        None => hasher.update([0u8]),
    }
    hasher.update(data);
    hasher.finalize().into()
}

/// Check an entry's signature against the public key it carries.
///
/// This is what a party without the account's secret (the store) can check.
pub fn verify_entry(entry: &Entry) -> Result<(), StoreError> {
    let public_key = AccountPublicKey::from_bytes(&entry.public_key)?;
    let digest = signing_digest(&entry.path, entry.parent.as_ref(), &entry.data);
    public_key.verify(&digest, &entry.signature)
}

/// A read result after verification and decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedEntry {
    pub path: PathHash,
    pub parent: Option<PathHash>,
    /// Plaintext value, `None` for bare collections and unchanged stubs
    pub value: Option<Vec<u8>>,
    pub timestamp: i64,
    pub has_children: bool,
    /// Node skipped by a `since` read
    pub unchanged: bool,
    pub children: Vec<OpenedEntry>,
}

impl OpenedEntry {
    /// Find a node in this subtree by path hash.
    pub fn find(&self, path: &PathHash) -> Option<&OpenedEntry> {
        if self.path == *path {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(path))
    }
}

/// Seals and opens entries for one account.
#[derive(Clone)]
pub struct EntryEnvelope {
    account: AccountId,
    keypair: AccountKeypair,
    keys: EntryKeys,
}

impl EntryEnvelope {
    /// Derives the account's entry keys once; they are reused for every entry.
    pub fn new(account: AccountId, keypair: AccountKeypair) -> Self {
        let keys = EntryKeys::derive(&account, &keypair);
        Self {
            account,
            keypair,
            keys,
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn public_key(&self) -> AccountPublicKey {
        self.keypair.public_key()
    }

    /// Encrypt and sign `value` for the entry at `path` under `parent`.
    pub fn seal(
        &self,
        path: PathHash,
        parent: Option<PathHash>,
        value: &[u8],
    ) -> Result<Entry, StoreError> {
        let data = self.keys.cipher_for(&path)?.encrypt(value)?;
        let digest = signing_digest(&path, parent.as_ref(), &data);
        let signature = self.keypair.sign(&digest);

        Ok(Entry::new(path, parent, data)
            .with_signature(signature.to_vec(), self.keypair.public_key().to_bytes().to_vec()))
    }

    /// Seal a value addressed by logical path; the own and parent hashes are
    /// computed from it.
    pub fn seal_path(&self, logical_path: &str, value: &[u8]) -> Result<Entry, StoreError> {
        let (own, parent) = path::entry_address(&self.account, logical_path)?;
        self.seal(own, parent, value)
    }

    /// Verify and decrypt an entry and every materialized descendant.
    ///
    /// Same as [`EntryEnvelope::open_since`] for a read made without a
    /// `since` cutoff, so unchanged stubs are refused.
    pub fn open(&self, entry: &Entry) -> Result<OpenedEntry, StoreError> {
        self.open_since(entry, None)
    }

    /// Verify and decrypt the result of a read made with cutoff `since`.
    ///
    /// Every node must be signed by this account's key, with two exceptions
    /// that open to `value = None`:
    /// - the account root while it is still bare (no data, no signature)
    /// - an unchanged stub, when `since` was asked for, the stub is older
    ///   than it and carries no children
    ///
    /// # Errors
    ///
    /// Fails on the first node whose signature or AEAD tag does not check
    /// out, or that claims one of the exceptions without qualifying;
    /// nothing of the tree is returned in that case.
    pub fn open_since(&self, entry: &Entry, since: Option<i64>) -> Result<OpenedEntry, StoreError> {
        let value = if entry.unchanged {
            self.check_stub(entry, since)?;
            None
        } else if entry.is_bare() {
            self.check_bare(entry)?;
            None
        } else {
            Some(self.open_value(entry)?)
        };

        let children = entry
            .children
            .iter()
            .map(|child| self.open_since(child, since))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OpenedEntry {
            path: entry.path,
            parent: entry.parent,
            value,
            timestamp: entry.timestamp,
            has_children: entry.has_children,
            unchanged: entry.unchanged,
            children,
        })
    }

    fn check_stub(&self, entry: &Entry, since: Option<i64>) -> Result<(), StoreError> {
        let pruned = since.is_some_and(|cutoff| entry.timestamp < cutoff);
        if !pruned || !entry.children.is_empty() || !entry.data.is_empty() {
            return Err(StoreError::SignatureInvalid(format!(
                "entry {} is marked unchanged without being pruned",
                entry.path
            )));
        }
        Ok(())
    }

    fn check_bare(&self, entry: &Entry) -> Result<(), StoreError> {
        if entry.path != path::root_hash(&self.account) || entry.parent.is_some() {
            return Err(StoreError::SignatureInvalid(format!(
                "entry {} carries no signature",
                entry.path
            )));
        }
        Ok(())
    }

    fn open_value(&self, entry: &Entry) -> Result<Vec<u8>, StoreError> {
        let own_key = self.keypair.public_key().to_bytes();
        if entry.public_key.as_slice() != own_key.as_slice() {
            return Err(StoreError::SignatureInvalid(format!(
                "entry {} is not signed by the account key",
                entry.path
            )));
        }
        verify_entry(entry)?;
        self.keys.cipher_for(&entry.path)?.decrypt(&entry.data)
    }
}

impl std::fmt::Debug for EntryEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryEnvelope")
            .field("account", &self.account)
            .field("public_key", &self.keypair.public_key().to_hex())
            .finish_non_exhaustive()
    }
}
