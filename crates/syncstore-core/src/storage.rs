//! Per-account persistent storage using redb.
//!
//! Every account gets its own database file, so accounts never share a
//! transaction or a lock. Inside one file redb gives us exactly what the
//! tree needs:
//! - one writer at a time, any number of concurrent readers
//! - readers see either the state before or after a write transaction,
//!   never the middle of one
//!
//! The tree operations themselves live in [`tree`]; handle caching across
//! accounts lives in [`registry`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use redb::{Database, TableDefinition};
use tracing::{debug, error};

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::types::AccountId;

// Submodules
mod registry;
mod tree;

pub use registry::{RegistryOptions, StoreRegistry};

/// Entries keyed by hex path hash, value is a postcard `NodeRecord`
pub(crate) const ENTRIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

/// File name of the database inside an account's shard directory
pub const STORE_FILE_NAME: &str = "store.redb";

/// Default bound on tree depth for reads and ancestor walks
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Location of an account's database below `root`.
///
/// The first two hex characters of the account id name a directory, the
/// remaining characters a sub-directory holding the file.
pub fn account_store_path(root: &Path, account: &AccountId) -> PathBuf {
    let hex = account.to_hex();
    let (shard, rest) = hex.split_at(2);
    root.join(shard).join(rest).join(STORE_FILE_NAME)
}

/// Open storage for one account.
///
/// Cheap to clone; all clones share the same database handle.
#[derive(Clone)]
pub struct AccountStore {
    account: AccountId,
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    max_depth: usize,
}

impl AccountStore {
    /// Open (or create) the account's database at `path` with the wall clock.
    pub fn open(account: AccountId, path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with(account, path, Arc::new(SystemClock), DEFAULT_MAX_DEPTH)
    }

    /// Open (or create) the account's database at `path`.
    ///
    /// This will:
    /// - Create the shard directories if they don't exist
    /// - Initialize the database file and the entries table
    /// - Materialize the root entry if it is absent
    pub fn open_with(
        account: AccountId,
        path: impl AsRef<Path>,
        clock: Arc<dyn Clock>,
        max_depth: usize,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref();

        let db = Self::create_database(path).map_err(|e| {
            error!(%account, ?path, error = %e, "Failed to open account store");
            StoreError::StorageUnavailable(format!("account {}: {}", account, e))
        })?;

        let store = Self::from_database(account, Arc::new(db), clock, max_depth);
        store.ensure_root()?;

        debug!(%account, ?path, "Account store opened");
        Ok(store)
    }

    /// Wrap a database that is already open and initialized.
    fn from_database(
        account: AccountId,
        db: Arc<Database>,
        clock: Arc<dyn Clock>,
        max_depth: usize,
    ) -> Self {
        Self {
            account,
            db,
            clock,
            max_depth: max_depth.max(1),
        }
    }

    /// Handle that stays valid only while some clone is alive.
    fn downgrade(&self) -> Weak<Database> {
        Arc::downgrade(&self.db)
    }

    fn create_database(path: &Path) -> Result<Database, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Database::create(path)?)
    }

    /// Account this store belongs to
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Maximum tree depth honoured by reads and ancestor walks
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now()
    }
}

impl std::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountStore")
            .field("account", &self.account)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_account_store_path_is_sharded() {
        let root = Path::new("/data");
        let account = AccountId::from_bytes([0xab; 32]);
        let path = account_store_path(root, &account);

        let hex = account.to_hex();
        assert_eq!(
            path,
            root.join("ab").join(&hex[2..]).join(STORE_FILE_NAME)
        );
    }

    #[test]
    fn test_store_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let account = AccountId::from_bytes([1; 32]);
        let path = account_store_path(temp_dir.path(), &account);

        let store = AccountStore::open(account, &path);
        assert!(store.is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_open_unwritable_location_is_storage_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where a directory is expected
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let account = AccountId::from_bytes([2; 32]);
        let result = AccountStore::open(account, blocker.join("x").join(STORE_FILE_NAME));
        assert!(matches!(result, Err(StoreError::StorageUnavailable(_))));
    }

    #[test]
    fn test_reopen_persists_data() {
        let temp_dir = TempDir::new().unwrap();
        let account = AccountId::from_bytes([3; 32]);
        let path = account_store_path(temp_dir.path(), &account);
        let (own, parent) = crate::path::entry_address(&account, "/settings").unwrap();

        {
            let store = AccountStore::open(account, &path).unwrap();
            store
                .set(crate::types::Entry::new(own, parent, b"sealed".to_vec()))
                .unwrap();
        }

        let store = AccountStore::open(account, &path).unwrap();
        let entry = store.get(&own, false, None).unwrap();
        assert_eq!(entry.data, b"sealed".to_vec());
    }
}
