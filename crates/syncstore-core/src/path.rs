//! Logical path normalization and path hashing.
//!
//! Callers address entries by human-readable paths such as `/contacts/7`.
//! Before anything reaches the tree repository the path is normalized and
//! hashed together with the owning account:
//!
//! ```text
//! PathHash = SHA-256(account_id (32 bytes) || normalized path (UTF-8))
//! ```
//!
//! The repository only ever sees the resulting hashes, for both the entry
//! itself and its parent.

use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::types::{AccountId, PathHash};

/// Logical path of every account's root entry
pub const ROOT_PATH: &str = "/";

/// Normalize a logical path.
///
/// Repeated slashes collapse and a trailing slash is dropped. The path must
/// be absolute and may not contain `.` or `..` segments.
pub fn normalize(path: &str) -> Result<String, StoreError> {
    if !path.starts_with('/') {
        return Err(StoreError::InvalidInput(format!(
            "path must be absolute: {:?}",
            path
        )));
    }

    let mut out = String::with_capacity(path.len());
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(StoreError::InvalidInput(format!(
                "relative segment in path: {:?}",
                path
            )));
        }
        out.push('/');
        out.push_str(segment);
    }

    if out.is_empty() {
        out.push('/');
    }
    Ok(out)
}

/// Parent of a normalized path, `None` for the root.
pub fn parent_path(path: &str) -> Option<&str> {
    if path == ROOT_PATH {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT_PATH),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Hash a logical path for an account. The path is normalized first.
pub fn hash(account: &AccountId, path: &str) -> Result<PathHash, StoreError> {
    let path = normalize(path)?;
    Ok(hash_normalized(account, &path))
}

fn hash_normalized(account: &AccountId, path: &str) -> PathHash {
    let mut hasher = Sha256::new();
    hasher.update(account.as_bytes());
    hasher.update(path.as_bytes());
    PathHash(hasher.finalize().into())
}

/// Path hash of the account's root entry.
pub fn root_hash(account: &AccountId) -> PathHash {
    hash_normalized(account, ROOT_PATH)
}

/// Own and parent hash for a logical path, ready to hand to a write.
pub fn entry_address(
    account: &AccountId,
    path: &str,
) -> Result<(PathHash, Option<PathHash>), StoreError> {
    let path = normalize(path)?;
    let own = hash_normalized(account, &path);
    let parent = parent_path(&path).map(|p| hash_normalized(account, p));
    Ok((own, parent))
}
