//! SyncStore Core Library
//!
//! Per-account hierarchical storage with cheap "what changed since T" reads
//! and client-side sealed values.
//!
//! ## Overview
//!
//! Each account owns a small tree of entries (contacts, settings and other
//! structured records), addressed by hashes of logical paths such as
//! `/contacts/7`. The store keeps two promises:
//!
//! - **Incremental sync**: every write bumps the timestamp of all ancestors,
//!   so a read with a `since` cutoff can skip any subtree whose root is older
//! - **Confidentiality and authenticity**: values are encrypted and signed
//!   before they reach the store, which never sees plaintext and cannot
//!   forge entries
//!
//! ## Quick Start
//!
//! ```no_run
//! use syncstore_core::{path, AccountId, AccountKeypair, EntryEnvelope, StoreRegistry};
//!
//! # fn main() -> Result<(), syncstore_core::StoreError> {
//! let registry = StoreRegistry::new("/var/lib/syncstore");
//! let account = AccountId::from_bytes([7u8; 32]);
//! let envelope = EntryEnvelope::new(account, AccountKeypair::generate()?);
//!
//! registry.set(&account, envelope.seal_path("/contacts", b"")?)?;
//! registry.set(&account, envelope.seal_path("/contacts/1", b"alice")?)?;
//!
//! let contacts = path::hash(&account, "/contacts")?;
//! let tree = registry.get(&account, &contacts, true, None)?;
//! let opened = envelope.open(&tree)?;
//! assert_eq!(opened.children.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod path;
pub mod storage;
pub mod types;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{EntryCipher, EntryKeys};
pub use envelope::{signing_digest, verify_entry, EntryEnvelope, OpenedEntry};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use identity::{AccountKeypair, AccountPublicKey};
pub use storage::{AccountStore, RegistryOptions, StoreRegistry};
pub use types::*;
