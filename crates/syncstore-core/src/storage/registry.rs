//! Registry of open account stores.
//!
//! redb refuses to open the same file twice in a process, so each account
//! gets a slot of its own and the open runs under that slot's lock. The map
//! lock is only held to look up or insert a slot, which keeps a slow open
//! of one account from stalling the others.
//!
//! Closing an account drops the registry's handle but remembers a weak
//! reference to the database. While clones handed out earlier are still
//! alive the file stays open, and the next `open` reuses it instead of
//! failing on the held lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use redb::Database;
use tracing::{debug, info};

use super::{account_store_path, AccountStore, DEFAULT_MAX_DEPTH};
use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::types::{AccountId, Entry, PathHash};

/// Settings applied to every store the registry opens
#[derive(Clone)]
pub struct RegistryOptions {
    /// Bound on tree depth for reads and ancestor walks
    pub max_depth: usize,
    /// Time source for entry timestamps
    pub clock: Arc<dyn Clock>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            clock: Arc::new(SystemClock),
        }
    }
}

impl std::fmt::Debug for RegistryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryOptions")
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Slot {
    store: Option<AccountStore>,
    released: Weak<Database>,
}

/// Handle table mapping account ids to their open stores.
///
/// Handles stay cached until [`StoreRegistry::close`] is called.
pub struct StoreRegistry {
    root: PathBuf,
    options: RegistryOptions,
    stores: Mutex<HashMap<AccountId, Arc<Mutex<Slot>>>>,
}

impl StoreRegistry {
    /// Create a registry keeping account files below `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_options(root, RegistryOptions::default())
    }

    pub fn with_options(root: impl AsRef<Path>, options: RegistryOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Directory holding all account shards
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of an account's database file
    pub fn store_path(&self, account: &AccountId) -> PathBuf {
        account_store_path(&self.root, account)
    }

    /// Return the account's store, opening (and initializing) it on first use.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StorageUnavailable` if the file cannot be opened.
    /// Other accounts are unaffected.
    pub fn open(&self, account: &AccountId) -> Result<AccountStore, StoreError> {
        let slot = self.slot(account);
        let mut slot = slot.lock();
        if let Some(store) = &slot.store {
            return Ok(store.clone());
        }

        let store = match slot.released.upgrade() {
            Some(db) => {
                debug!(%account, "Reusing database still held by earlier handles");
                AccountStore::from_database(
                    *account,
                    db,
                    self.options.clock.clone(),
                    self.options.max_depth,
                )
            }
            None => AccountStore::open_with(
                *account,
                self.store_path(account),
                self.options.clock.clone(),
                self.options.max_depth,
            )?,
        };
        slot.released = Weak::new();
        slot.store = Some(store.clone());

        info!(%account, "Account store opened");
        Ok(store)
    }

    /// Drop the cached handle. Returns `false` if the account was not open.
    ///
    /// The file is released once every outstanding clone of the handle is
    /// dropped. Until then a later `open` picks the same database back up.
    pub fn close(&self, account: &AccountId) -> bool {
        let slot = self.stores.lock().get(account).cloned();
        let closed = match slot {
            Some(slot) => release(&mut slot.lock()),
            None => false,
        };
        if closed {
            info!(%account, "Account store closed");
        } else {
            debug!(%account, "Close requested for account that is not open");
        }
        closed
    }

    /// Drop every cached handle.
    pub fn close_all(&self) {
        let count = self
            .slots()
            .into_iter()
            .filter(|(_, slot)| release(&mut slot.lock()))
            .count();
        info!(count, "Closed all account stores");
    }

    pub fn is_open(&self, account: &AccountId) -> bool {
        let slot = self.stores.lock().get(account).cloned();
        slot.is_some_and(|slot| slot.lock().store.is_some())
    }

    /// Accounts that currently have a cached handle
    pub fn open_accounts(&self) -> Vec<AccountId> {
        let mut accounts: Vec<_> = self
            .slots()
            .into_iter()
            .filter(|(_, slot)| slot.lock().store.is_some())
            .map(|(account, _)| account)
            .collect();
        accounts.sort();
        accounts
    }

    fn slot(&self, account: &AccountId) -> Arc<Mutex<Slot>> {
        self.stores.lock().entry(*account).or_default().clone()
    }

    /// Snapshot of the slot table, taken so slot locks are never waited on
    /// while the map lock is held.
    fn slots(&self) -> Vec<(AccountId, Arc<Mutex<Slot>>)> {
        self.stores
            .lock()
            .iter()
            .map(|(account, slot)| (*account, slot.clone()))
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Account-addressed tree operations
    // ═══════════════════════════════════════════════════════════════════════

    pub fn has(&self, account: &AccountId, path: &PathHash) -> Result<bool, StoreError> {
        self.open(account)?.has(path)
    }

    pub fn get(
        &self,
        account: &AccountId,
        path: &PathHash,
        recursive: bool,
        since: Option<i64>,
    ) -> Result<Entry, StoreError> {
        self.open(account)?.get(path, recursive, since)
    }

    pub fn set(&self, account: &AccountId, entry: Entry) -> Result<i64, StoreError> {
        self.open(account)?.set(entry)
    }

    pub fn remove(
        &self,
        account: &AccountId,
        path: &PathHash,
        recursive: bool,
    ) -> Result<i64, StoreError> {
        self.open(account)?.remove(path, recursive)
    }
}

fn release(slot: &mut Slot) -> bool {
    match slot.store.take() {
        Some(store) => {
            slot.released = store.downgrade();
            true
        }
        None => false,
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("root", &self.root)
            .field("open", &self.open_accounts().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use tempfile::TempDir;

    fn create_test_registry() -> (StoreRegistry, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let registry = StoreRegistry::new(temp_dir.path());
        (registry, temp_dir)
    }

    #[test]
    fn test_open_is_cached() {
        let (registry, _temp) = create_test_registry();
        let account = AccountId::from_bytes([1; 32]);

        registry.open(&account).unwrap();
        registry.open(&account).unwrap();

        assert!(registry.is_open(&account));
        assert_eq!(registry.open_accounts(), vec![account]);
    }

    #[test]
    fn test_open_materializes_root() {
        let (registry, _temp) = create_test_registry();
        let account = AccountId::from_bytes([2; 32]);
        assert!(registry.has(&account, &path::root_hash(&account)).unwrap());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (registry, _temp) = create_test_registry();
        let account = AccountId::from_bytes([3; 32]);

        assert!(!registry.close(&account));
        registry.open(&account).unwrap();
        assert!(registry.close(&account));
        assert!(!registry.close(&account));
        assert!(!registry.is_open(&account));
    }

    #[test]
    fn test_reopen_after_close_sees_data() {
        let (registry, _temp) = create_test_registry();
        let account = AccountId::from_bytes([4; 32]);
        let (own, parent) = path::entry_address(&account, "/settings").unwrap();

        registry
            .set(&account, Entry::new(own, parent, b"x".to_vec()))
            .unwrap();
        registry.close(&account);

        assert!(registry.has(&account, &own).unwrap());
    }

    #[test]
    fn test_accounts_are_isolated() {
        let (registry, temp) = create_test_registry();
        let alice = AccountId::from_bytes([5; 32]);
        let bob = AccountId::from_bytes([6; 32]);

        let (own, parent) = path::entry_address(&alice, "/contacts").unwrap();
        registry
            .set(&alice, Entry::new(own, parent, vec![]))
            .unwrap();

        assert!(!registry.has(&bob, &own).unwrap());
        assert_ne!(registry.store_path(&alice), registry.store_path(&bob));
        assert!(registry.store_path(&alice).starts_with(temp.path()));
    }

    #[test]
    fn test_failed_open_does_not_affect_other_accounts() {
        let temp_dir = TempDir::new().unwrap();
        let registry = StoreRegistry::new(temp_dir.path());
        let good = AccountId::from_bytes([0x11; 32]);
        let bad = AccountId::from_bytes([0x22; 32]);

        // Occupy the bad account's shard directory with a regular file
        std::fs::write(temp_dir.path().join("22"), b"blocked").unwrap();

        assert!(matches!(
            registry.open(&bad),
            Err(StoreError::StorageUnavailable(_))
        ));
        assert!(!registry.is_open(&bad));
        assert!(registry.open(&good).is_ok());
    }

    #[test]
    fn test_concurrent_open_yields_single_handle() {
        let (registry, _temp) = create_test_registry();
        let registry = Arc::new(registry);
        let account = AccountId::from_bytes([7; 32]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.open(&account).map(|_| ()))
            })
            .collect();

        for h in handles {
            h.join().unwrap().unwrap();
        }
        assert_eq!(registry.open_accounts().len(), 1);
    }

    #[test]
    fn test_reopen_while_handle_is_held() {
        let (registry, _temp) = create_test_registry();
        let account = AccountId::from_bytes([8; 32]);
        let (own, parent) = path::entry_address(&account, "/inbox").unwrap();

        let held = registry.open(&account).unwrap();
        assert!(registry.close(&account));

        let reopened = registry.open(&account).unwrap();
        held.set(Entry::new(own, parent, b"mail".to_vec())).unwrap();
        assert!(reopened.has(&own).unwrap());
        assert!(registry.is_open(&account));

        drop(held);
        drop(reopened);
        assert!(registry.close(&account));
        assert!(registry.has(&account, &own).unwrap());
    }

    #[test]
    fn test_open_of_one_account_does_not_block_others() {
        let (registry, _temp) = create_test_registry();
        let busy = AccountId::from_bytes([9; 32]);
        let idle = AccountId::from_bytes([10; 32]);

        let slot = registry.slot(&busy);
        let guard = slot.lock();

        let registry = &registry;
        let opened = std::thread::scope(|scope| {
            let (tx, rx) = std::sync::mpsc::channel();
            scope.spawn(move || {
                let opened = registry.open(&idle).is_ok();
                let _ = tx.send(opened);
            });
            rx.recv_timeout(std::time::Duration::from_secs(10))
        });
        drop(guard);

        assert_eq!(opened, Ok(true));
        assert_eq!(registry.open_accounts(), vec![idle]);
    }
}
