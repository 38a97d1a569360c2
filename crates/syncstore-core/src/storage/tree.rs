//! Tree repository: parent/child integrity and timestamp propagation.
//!
//! Each node is persisted on its own, with the hashes of its children kept
//! as a set, and the nested tree is rebuilt on read. Every write and delete
//! runs in a single redb write transaction that covers the node itself, the
//! parent's child set and the timestamp of every ancestor up to the root.
//! A reader therefore never sees a child change without the matching
//! ancestor bumps.
//!
//! Invariant kept by propagation: a node's timestamp is `>=` the timestamp
//! of every descendant. Sync reads lean on it to skip whole subtrees whose
//! root is older than the `since` cutoff.

use std::collections::{BTreeSet, HashSet};

use redb::{ReadableTable, Table};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AccountStore, ENTRIES_TABLE};
use crate::error::StoreError;
use crate::path;
use crate::types::{Entry, PathHash};

/// Stored representation of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct NodeRecord {
    pub parent: Option<PathHash>,
    pub data: Vec<u8>,
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
    pub timestamp: i64,
    pub children: BTreeSet<PathHash>,
}

impl NodeRecord {
    fn bare(parent: Option<PathHash>, timestamp: i64) -> Self {
        Self {
            parent,
            data: Vec::new(),
            signature: Vec::new(),
            public_key: Vec::new(),
            timestamp,
            children: BTreeSet::new(),
        }
    }
}

/// Child-set edit applied to the first node of an ancestor walk
enum ChildChange {
    Add(PathHash),
    Remove(PathHash),
}

fn load_node<T>(table: &T, path: &PathHash) -> Result<Option<NodeRecord>, StoreError>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let key = path.to_hex();
    match table.get(key.as_str())? {
        Some(v) => Ok(Some(postcard::from_bytes(v.value())?)),
        None => Ok(None),
    }
}

fn store_node(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    path: &PathHash,
    record: &NodeRecord,
) -> Result<(), StoreError> {
    let key = path.to_hex();
    let bytes = postcard::to_allocvec(record)?;
    table.insert(key.as_str(), bytes.as_slice())?;
    Ok(())
}

impl AccountStore {
    /// Create the entries table and the root entry if they are missing.
    pub(super) fn ensure_root(&self) -> Result<(), StoreError> {
        let root = path::root_hash(&self.account);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTRIES_TABLE)?;
            if load_node(&table, &root)?.is_none() {
                debug!(account = %self.account, "Creating root entry");
                store_node(&mut table, &root, &NodeRecord::bare(None, self.now()))?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Path hash of this account's root entry
    pub fn root(&self) -> PathHash {
        path::root_hash(&self.account)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════════

    /// Check whether an entry exists.
    pub fn has(&self, path: &PathHash) -> Result<bool, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES_TABLE)?;
        let key = path.to_hex();
        Ok(table.get(key.as_str())?.is_some())
    }

    /// Read an entry, optionally with its whole subtree.
    ///
    /// With `recursive = false` only the node itself is returned and its
    /// children are never touched. With `recursive = true` every recorded
    /// child is read the same way and appended to `children`.
    ///
    /// When `since` is given, any node whose timestamp is older than it is
    /// returned as an unchanged stub (see [`Entry::unchanged`]) without data
    /// and without descending into its children. Because ancestors always
    /// carry the newest timestamp of their subtree, nothing below a stub can
    /// be newer than `since`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::PathNotFound` if the node does not exist and
    /// `StoreError::Corrupted` if the walk hits a cycle or the depth bound.
    pub fn get(
        &self,
        path: &PathHash,
        recursive: bool,
        since: Option<i64>,
    ) -> Result<Entry, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES_TABLE)?;

        let record = load_node(&table, path)?.ok_or_else(|| {
            debug!(account = %self.account, %path, "Entry not found");
            StoreError::PathNotFound(path.to_hex())
        })?;

        let mut ancestors = Vec::new();
        self.read_node(&table, *path, record, recursive, since, &mut ancestors)
    }

    fn read_node<T>(
        &self,
        table: &T,
        path: PathHash,
        record: NodeRecord,
        recursive: bool,
        since: Option<i64>,
        ancestors: &mut Vec<PathHash>,
    ) -> Result<Entry, StoreError>
    where
        T: ReadableTable<&'static str, &'static [u8]>,
    {
        if ancestors.len() >= self.max_depth {
            return Err(StoreError::Corrupted(format!(
                "tree deeper than {} below {}",
                self.max_depth, path
            )));
        }

        let has_children = !record.children.is_empty();

        if since.is_some_and(|cutoff| record.timestamp < cutoff) {
            return Ok(Entry {
                path,
                parent: record.parent,
                timestamp: record.timestamp,
                has_children,
                unchanged: true,
                ..Default::default()
            });
        }

        let mut entry = Entry {
            path,
            parent: record.parent,
            data: record.data,
            timestamp: record.timestamp,
            has_children,
            children: Vec::new(),
            signature: record.signature,
            public_key: record.public_key,
            unchanged: false,
        };

        if !recursive || !has_children {
            return Ok(entry);
        }

        ancestors.push(path);
        for child in &record.children {
            if ancestors.contains(child) {
                return Err(StoreError::Corrupted(format!(
                    "entry {} is its own ancestor",
                    child
                )));
            }
            match load_node(table, child)? {
                Some(child_record) => {
                    let child_entry =
                        self.read_node(table, *child, child_record, recursive, since, ancestors)?;
                    entry.children.push(child_entry);
                }
                None => {
                    warn!(account = %self.account, parent = %path, %child, "Dangling child reference");
                }
            }
        }
        ancestors.pop();

        Ok(entry)
    }

    /// Number of entries stored for this account, root included.
    pub fn entry_count(&self) -> Result<usize, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES_TABLE)?;
        let mut count = 0;
        for item in table.iter()? {
            item?;
            count += 1;
        }
        Ok(count)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Writes
    // ═══════════════════════════════════════════════════════════════════════

    /// Create or replace an entry and return the timestamp it was stamped with.
    ///
    /// In one transaction this will:
    /// - Verify the declared parent exists
    /// - Persist the entry, keeping any children it already has
    /// - Add the entry to the parent's child set (no-op if already there)
    /// - Bump the timestamp of every ancestor up to the root
    ///
    /// If the entry already existed under a different parent it is moved:
    /// the old parent forgets it and its ancestors are bumped as well.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ParentNotFound` if the parent does not exist and
    /// `StoreError::InvalidInput` for entries that would break the tree shape
    /// (a non-root without parent, a root with one, a cycle, or a node at or
    /// below the depth bound). Nothing is written in either case.
    pub fn set(&self, entry: Entry) -> Result<i64, StoreError> {
        let root = self.root();
        let path = entry.path;

        match (path == root, entry.parent) {
            (true, Some(_)) => {
                return Err(StoreError::InvalidInput(
                    "root entry cannot have a parent".to_string(),
                ))
            }
            (false, None) => {
                return Err(StoreError::InvalidInput(format!(
                    "entry {} has no parent",
                    path
                )))
            }
            (false, Some(parent)) if parent == path => {
                return Err(StoreError::InvalidInput(format!(
                    "entry {} cannot be its own parent",
                    path
                )))
            }
            _ => {}
        }

        let write_txn = self.db.begin_write()?;
        let stamp = {
            let mut table = write_txn.open_table(ENTRIES_TABLE)?;

            if let Some(parent) = entry.parent {
                if load_node(&table, &parent)?.is_none() {
                    debug!(account = %self.account, %path, %parent, "Parent not found");
                    return Err(StoreError::ParentNotFound(parent.to_hex()));
                }
            }

            let existing = load_node(&table, &path)?;
            if let Some(parent) = entry.parent {
                let depth = self.parent_depth(&table, path, parent)? + 1;
                if let Some(record) = &existing {
                    self.check_subtree_fits(&table, record, self.max_depth - 1 - depth)?;
                }
            }

            let stamp = self.stamp(&table, &root)?;

            let (children, old_parent) = match existing {
                Some(record) => (record.children, record.parent),
                None => (BTreeSet::new(), None),
            };

            let record = NodeRecord {
                parent: entry.parent,
                data: entry.data,
                signature: entry.signature,
                public_key: entry.public_key,
                timestamp: stamp,
                children,
            };
            store_node(&mut table, &path, &record)?;

            if let Some(old) = old_parent.filter(|old| Some(*old) != entry.parent) {
                debug!(account = %self.account, %path, from = %old, "Re-parenting entry");
                self.touch_ancestors(&mut table, old, stamp, Some(ChildChange::Remove(path)))?;
            }
            if let Some(parent) = entry.parent {
                self.touch_ancestors(&mut table, parent, stamp, Some(ChildChange::Add(path)))?;
            }

            stamp
        };
        write_txn.commit()?;

        debug!(account = %self.account, %path, timestamp = stamp, "Entry set");
        Ok(stamp)
    }

    /// Remove a leaf entry and return the timestamp propagated to its ancestors.
    ///
    /// Collections cannot be removed, with or without `recursive`; their
    /// children have to go first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::PathNotFound` if the entry does not exist,
    /// `StoreError::CannotRemoveCollection` if it still has children and
    /// `StoreError::InvalidInput` for the root entry.
    pub fn remove(&self, path: &PathHash, recursive: bool) -> Result<i64, StoreError> {
        let root = self.root();
        if *path == root {
            return Err(StoreError::InvalidInput(
                "root entry cannot be removed".to_string(),
            ));
        }

        let write_txn = self.db.begin_write()?;
        let stamp = {
            let mut table = write_txn.open_table(ENTRIES_TABLE)?;

            let record = load_node(&table, path)?.ok_or_else(|| {
                debug!(account = %self.account, %path, "Entry not found");
                StoreError::PathNotFound(path.to_hex())
            })?;

            if !record.children.is_empty() {
                debug!(
                    account = %self.account,
                    %path,
                    children = record.children.len(),
                    recursive,
                    "Refusing to remove collection"
                );
                return Err(StoreError::CannotRemoveCollection(path.to_hex()));
            }

            let stamp = self.stamp(&table, &root)?;

            let key = path.to_hex();
            table.remove(key.as_str())?;

            if let Some(parent) = record.parent {
                self.touch_ancestors(&mut table, parent, stamp, Some(ChildChange::Remove(*path)))?;
            }

            stamp
        };
        write_txn.commit()?;

        debug!(account = %self.account, %path, timestamp = stamp, "Entry removed");
        Ok(stamp)
    }

    /// Timestamp for the write in progress.
    ///
    /// Never older than the root's current timestamp, so a wall clock that
    /// steps backwards cannot leave an ancestor older than a descendant.
    fn stamp<T>(&self, table: &T, root: &PathHash) -> Result<i64, StoreError>
    where
        T: ReadableTable<&'static str, &'static [u8]>,
    {
        let root_ts = load_node(table, root)?.map(|r| r.timestamp).unwrap_or(i64::MIN);
        Ok(self.now().max(root_ts))
    }

    /// Walk from `start` up to the root, setting each timestamp to `stamp`.
    ///
    /// `change` is applied to the child set of `start` only.
    fn touch_ancestors(
        &self,
        table: &mut Table<'_, &'static str, &'static [u8]>,
        start: PathHash,
        stamp: i64,
        mut change: Option<ChildChange>,
    ) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        let mut current = Some(start);

        while let Some(path) = current {
            if !seen.insert(path) {
                return Err(StoreError::Corrupted(format!(
                    "cycle in ancestors at {}",
                    path
                )));
            }
            if seen.len() > self.max_depth {
                return Err(StoreError::Corrupted(format!(
                    "ancestor chain longer than {}",
                    self.max_depth
                )));
            }

            let mut record = load_node(&*table, &path)?
                .ok_or_else(|| StoreError::Corrupted(format!("missing ancestor {}", path)))?;

            match change.take() {
                Some(ChildChange::Add(child)) => {
                    record.children.insert(child);
                }
                Some(ChildChange::Remove(child)) => {
                    record.children.remove(&child);
                }
                None => {}
            }
            record.timestamp = record.timestamp.max(stamp);
            store_node(table, &path, &record)?;

            current = record.parent;
        }

        Ok(())
    }

    /// Depth of `parent` below the root, checking that `entry` can hang
    /// under it.
    ///
    /// Fails with `InvalidInput` if `entry` is `parent` or one of its
    /// ancestors, or if the entry would sit at or below the read depth bound.
    fn parent_depth<T>(
        &self,
        table: &T,
        entry: PathHash,
        parent: PathHash,
    ) -> Result<usize, StoreError>
    where
        T: ReadableTable<&'static str, &'static [u8]>,
    {
        let mut depth = 0;
        let mut current = parent;
        loop {
            if current == entry {
                return Err(StoreError::InvalidInput(format!(
                    "moving {} under {} would create a cycle",
                    entry, parent
                )));
            }
            if depth + 1 >= self.max_depth {
                return Err(StoreError::InvalidInput(format!(
                    "entry {} would be deeper than {} levels",
                    entry, self.max_depth
                )));
            }
            let record = load_node(table, &current)?
                .ok_or_else(|| StoreError::Corrupted(format!("missing ancestor {}", current)))?;
            match record.parent {
                Some(next) => {
                    depth += 1;
                    current = next;
                }
                None => return Ok(depth),
            }
        }
    }

    /// Fail if the subtree below `record` is more than `room` levels deep.
    fn check_subtree_fits<T>(
        &self,
        table: &T,
        record: &NodeRecord,
        room: usize,
    ) -> Result<(), StoreError>
    where
        T: ReadableTable<&'static str, &'static [u8]>,
    {
        if record.children.is_empty() {
            return Ok(());
        }
        if room == 0 {
            return Err(StoreError::InvalidInput(format!(
                "moved subtree would be deeper than {} levels",
                self.max_depth
            )));
        }
        for child in &record.children {
            if let Some(child_record) = load_node(table, child)? {
                self.check_subtree_fits(table, &child_record, room - 1)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{account_store_path, DEFAULT_MAX_DEPTH};
    use crate::types::AccountId;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        store: AccountStore,
        clock: Arc<ManualClock>,
        account: AccountId,
        _temp: TempDir,
    }

    fn create_test_store() -> Fixture {
        let temp = TempDir::new().unwrap();
        let account = AccountId::from_bytes([9; 32]);
        let clock = Arc::new(ManualClock::new(1_000));
        let store = AccountStore::open_with(
            account,
            account_store_path(temp.path(), &account),
            clock.clone(),
            DEFAULT_MAX_DEPTH,
        )
        .unwrap();
        Fixture {
            store,
            clock,
            account,
            _temp: temp,
        }
    }

    impl Fixture {
        fn hash(&self, p: &str) -> PathHash {
            path::hash(&self.account, p).unwrap()
        }

        fn put(&self, p: &str, data: &[u8]) -> Result<i64, StoreError> {
            let (own, parent) = path::entry_address(&self.account, p).unwrap();
            self.store.set(Entry::new(own, parent, data.to_vec()))
        }
    }

    #[test]
    fn test_root_exists_after_open() {
        let f = create_test_store();
        assert!(f.store.has(&f.hash("/")).unwrap());
        assert_eq!(f.store.entry_count().unwrap(), 1);

        let root = f.store.get(&f.store.root(), false, None).unwrap();
        assert_eq!(root.parent, None);
        assert!(root.is_bare());
        assert!(!root.has_children);
    }

    #[test]
    fn test_set_and_get_shallow() {
        let f = create_test_store();
        let ts = f.put("/settings", b"v1").unwrap();

        let entry = f.store.get(&f.hash("/settings"), false, None).unwrap();
        assert_eq!(entry.data, b"v1".to_vec());
        assert_eq!(entry.parent, Some(f.hash("/")));
        assert_eq!(entry.timestamp, ts);
        assert!(entry.children.is_empty());
    }

    #[test]
    fn test_set_is_upsert() {
        let f = create_test_store();
        f.put("/settings", b"v1").unwrap();
        f.clock.advance(10);
        f.put("/settings", b"v2").unwrap();

        let entry = f.store.get(&f.hash("/settings"), false, None).unwrap();
        assert_eq!(entry.data, b"v2".to_vec());
        assert_eq!(entry.timestamp, 1_010);
        assert_eq!(f.store.entry_count().unwrap(), 2);
    }

    #[test]
    fn test_upsert_keeps_children() {
        let f = create_test_store();
        f.put("/contacts", b"").unwrap();
        f.put("/contacts/1", b"a").unwrap();
        f.put("/contacts", b"renamed").unwrap();

        let entry = f.store.get(&f.hash("/contacts"), true, None).unwrap();
        assert!(entry.has_children);
        assert_eq!(entry.children.len(), 1);
    }

    #[test]
    fn test_set_without_existing_parent_fails() {
        let f = create_test_store();
        let result = f.put("/contacts/1", b"x");
        assert!(matches!(result, Err(StoreError::ParentNotFound(_))));
        assert!(!f.store.has(&f.hash("/contacts/1")).unwrap());
        assert_eq!(f.store.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_set_rejects_bad_shapes() {
        let f = create_test_store();
        let root = f.store.root();
        let other = f.hash("/x");

        let orphan = Entry::new(other, None, vec![]);
        assert!(matches!(f.store.set(orphan), Err(StoreError::InvalidInput(_))));

        let rooted_root = Entry::new(root, Some(other), vec![]);
        assert!(matches!(f.store.set(rooted_root), Err(StoreError::InvalidInput(_))));

        let own_parent = Entry::new(other, Some(other), vec![]);
        assert!(matches!(f.store.set(own_parent), Err(StoreError::InvalidInput(_))));
    }

    #[test]
    fn test_root_value_can_be_set() {
        let f = create_test_store();
        f.put("/", b"root value").unwrap();
        let root = f.store.get(&f.store.root(), false, None).unwrap();
        assert_eq!(root.data, b"root value".to_vec());
    }

    #[test]
    fn test_child_registration_is_idempotent() {
        let f = create_test_store();
        f.put("/contacts", b"").unwrap();
        f.put("/contacts/1", b"a").unwrap();
        f.put("/contacts/1", b"a").unwrap();

        let entry = f.store.get(&f.hash("/contacts"), true, None).unwrap();
        assert_eq!(entry.children.len(), 1);
    }

    #[test]
    fn test_timestamp_propagates_to_root() {
        let f = create_test_store();
        f.put("/a", b"").unwrap();
        f.clock.advance(5);
        f.put("/a/b", b"").unwrap();
        f.clock.advance(5);
        let ts = f.put("/a/b/c", b"leaf").unwrap();

        for p in ["/", "/a", "/a/b", "/a/b/c"] {
            let e = f.store.get(&f.hash(p), false, None).unwrap();
            assert_eq!(e.timestamp, ts, "timestamp of {}", p);
        }
    }

    #[test]
    fn test_stamp_never_goes_backwards() {
        let f = create_test_store();
        f.put("/a", b"").unwrap();
        f.clock.set(10);
        let ts = f.put("/b", b"").unwrap();

        assert_eq!(ts, 1_000);
        let root = f.store.get(&f.store.root(), false, None).unwrap();
        assert_eq!(root.timestamp, 1_000);
    }

    #[test]
    fn test_remove_leaf() {
        let f = create_test_store();
        f.put("/a", b"").unwrap();
        f.put("/a/b", b"").unwrap();
        f.clock.advance(30);

        let ts = f.store.remove(&f.hash("/a/b"), false).unwrap();
        assert_eq!(ts, 1_030);
        assert!(!f.store.has(&f.hash("/a/b")).unwrap());

        let parent = f.store.get(&f.hash("/a"), true, None).unwrap();
        assert!(!parent.has_children);
        assert!(parent.children.is_empty());
        assert_eq!(parent.timestamp, 1_030);
        assert_eq!(f.store.get(&f.store.root(), false, None).unwrap().timestamp, 1_030);
    }

    #[test]
    fn test_remove_collection_fails() {
        let f = create_test_store();
        f.put("/a", b"").unwrap();
        f.put("/a/b", b"").unwrap();

        for recursive in [false, true] {
            let result = f.store.remove(&f.hash("/a"), recursive);
            assert!(matches!(result, Err(StoreError::CannotRemoveCollection(_))));
        }
        assert!(f.store.has(&f.hash("/a")).unwrap());
    }

    #[test]
    fn test_remove_missing_and_root() {
        let f = create_test_store();
        assert!(matches!(
            f.store.remove(&f.hash("/nope"), false),
            Err(StoreError::PathNotFound(_))
        ));
        assert!(matches!(
            f.store.remove(&f.store.root(), false),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_get_missing_is_path_not_found() {
        let f = create_test_store();
        assert!(matches!(
            f.store.get(&f.hash("/nope"), true, None),
            Err(StoreError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_shallow_get_does_not_materialize_children() {
        let f = create_test_store();
        f.put("/a", b"").unwrap();
        f.put("/a/b", b"").unwrap();

        let entry = f.store.get(&f.hash("/a"), false, None).unwrap();
        assert!(entry.has_children);
        assert!(entry.children.is_empty());
    }

    #[test]
    fn test_since_returns_unchanged_stubs() {
        let f = create_test_store();
        f.put("/a", b"old").unwrap();
        f.put("/a/old", b"old").unwrap();
        let cutoff = f.clock.advance(60);
        f.put("/a/new", b"new").unwrap();

        let entry = f.store.get(&f.hash("/a"), true, Some(cutoff)).unwrap();
        assert!(!entry.unchanged);
        assert_eq!(entry.children.len(), 2);

        let old = entry.children.iter().find(|c| c.path == f.hash("/a/old")).unwrap();
        assert!(old.unchanged);
        assert!(old.data.is_empty());
        assert!(old.signature.is_empty());

        let new = entry.children.iter().find(|c| c.path == f.hash("/a/new")).unwrap();
        assert!(!new.unchanged);
        assert_eq!(new.data, b"new".to_vec());
    }

    #[test]
    fn test_since_on_stale_node_returns_stub() {
        let f = create_test_store();
        f.put("/a", b"x").unwrap();
        f.put("/a/b", b"y").unwrap();

        let entry = f.store.get(&f.hash("/a"), true, Some(5_000)).unwrap();
        assert!(entry.unchanged);
        assert!(entry.has_children);
        assert!(entry.children.is_empty());
        assert!(entry.data.is_empty());
    }

    #[test]
    fn test_reparent_moves_entry() {
        let f = create_test_store();
        f.put("/a", b"").unwrap();
        f.put("/b", b"").unwrap();
        f.put("/a/x", b"").unwrap();
        let x = f.hash("/a/x");

        f.clock.advance(10);
        f.store
            .set(Entry::new(x, Some(f.hash("/b")), b"moved".to_vec()))
            .unwrap();

        let a = f.store.get(&f.hash("/a"), true, None).unwrap();
        let b = f.store.get(&f.hash("/b"), true, None).unwrap();
        assert!(a.children.is_empty());
        assert_eq!(b.children.len(), 1);
        assert_eq!(a.timestamp, 1_010);
        assert_eq!(b.timestamp, 1_010);
    }

    #[test]
    fn test_reparent_under_descendant_is_rejected() {
        let f = create_test_store();
        f.put("/a", b"").unwrap();
        f.put("/a/b", b"").unwrap();

        let a = f.hash("/a");
        let result = f.store.set(Entry::new(a, Some(f.hash("/a/b")), vec![]));
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));

        let b = f.store.get(&f.hash("/a/b"), false, None).unwrap();
        assert_eq!(b.parent, Some(a));
    }

    fn open_bounded(temp: &TempDir, account: AccountId, max_depth: usize) -> AccountStore {
        AccountStore::open_with(
            account,
            account_store_path(temp.path(), &account),
            Arc::new(ManualClock::new(1)),
            max_depth,
        )
        .unwrap()
    }

    fn put_chain(store: &AccountStore, account: &AccountId, depth: usize) -> Result<i64, StoreError> {
        let p = "/n".repeat(depth);
        let (own, parent) = path::entry_address(account, &p).unwrap();
        store.set(Entry::new(own, parent, vec![]))
    }

    #[test]
    fn test_write_below_depth_bound_is_rejected() {
        let temp = TempDir::new().unwrap();
        let account = AccountId::from_bytes([4; 32]);
        let store = open_bounded(&temp, account, DEFAULT_MAX_DEPTH);

        for depth in 1..DEFAULT_MAX_DEPTH {
            put_chain(&store, &account, depth).unwrap();
        }
        let result = put_chain(&store, &account, DEFAULT_MAX_DEPTH);
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));

        let root = store.get(&store.root(), true, None).unwrap();
        assert_eq!(root.walk().count(), DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_reparent_past_depth_bound_is_rejected() {
        let temp = TempDir::new().unwrap();
        let account = AccountId::from_bytes([5; 32]);
        let store = open_bounded(&temp, account, 4);
        let put = |p: &str| {
            let (own, parent) = path::entry_address(&account, p).unwrap();
            store.set(Entry::new(own, parent, vec![]))
        };
        put("/a").unwrap();
        put("/a/b").unwrap();
        put("/x").unwrap();
        put("/x/y").unwrap();

        // /a would land at depth 3 with /a/b at depth 4
        let a = path::hash(&account, "/a").unwrap();
        let y = path::hash(&account, "/x/y").unwrap();
        let result = store.set(Entry::new(a, Some(y), vec![]));
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));

        let moved = store.get(&a, false, None).unwrap();
        assert_eq!(moved.parent, Some(store.root()));
        assert!(store.get(&store.root(), true, None).is_ok());
    }

    #[test]
    fn test_depth_bound_is_enforced_on_read() {
        let temp = TempDir::new().unwrap();
        let account = AccountId::from_bytes([6; 32]);
        {
            let store = open_bounded(&temp, account, 4);
            for depth in 1..=3 {
                put_chain(&store, &account, depth).unwrap();
            }
        }

        // Reopened with a tighter bound the existing tree is too deep
        let store = open_bounded(&temp, account, 3);
        assert!(matches!(
            store.get(&store.root(), true, None),
            Err(StoreError::Corrupted(_))
        ));
        assert!(store.get(&store.root(), false, None).is_ok());
    }
}
