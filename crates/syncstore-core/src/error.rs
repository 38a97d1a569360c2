//! Error types for the account store

use thiserror::Error;

/// Main error type for store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// No entry exists at the given path hash
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// The declared parent of a written entry does not exist
    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    /// Attempted to remove an entry that still has children
    #[error("Cannot remove collection: {0}")]
    CannotRemoveCollection(String),

    /// Malformed path, identifier or entry shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Stored tree violates a structural invariant (cycle, depth bound, bad record)
    #[error("Store corrupted: {0}")]
    Corrupted(String),

    /// The account's storage file could not be opened
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Cryptographic operation failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Signature verification failed
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// Decryption failed (wrong key, tampered data, or malformed input)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Error during record serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] postcard::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`StoreError`], used by callers that map
/// failures onto another protocol (HTTP status codes, exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PathNotFound,
    ParentNotFound,
    CannotRemoveCollection,
    CryptoFailure,
    StorageUnavailable,
    InvalidInput,
    Corrupted,
}

impl ErrorKind {
    /// Stable snake_case name, suitable for wire responses
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PathNotFound => "path_not_found",
            ErrorKind::ParentNotFound => "parent_not_found",
            ErrorKind::CannotRemoveCollection => "cannot_remove_collection",
            ErrorKind::CryptoFailure => "crypto_failure",
            ErrorKind::StorageUnavailable => "storage_unavailable",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Corrupted => "corrupted",
        }
    }

    /// Inverse of [`ErrorKind::as_str`]
    pub fn parse(s: &str) -> Option<Self> {
        [
            ErrorKind::PathNotFound,
            ErrorKind::ParentNotFound,
            ErrorKind::CannotRemoveCollection,
            ErrorKind::CryptoFailure,
            ErrorKind::StorageUnavailable,
            ErrorKind::InvalidInput,
            ErrorKind::Corrupted,
        ]
        .into_iter()
        .find(|k| k.as_str() == s)
    }

    /// Whether this kind is a normal outcome of client behaviour rather than
    /// a fault in the store itself.
    pub fn is_routine(&self) -> bool {
        !matches!(self, ErrorKind::StorageUnavailable | ErrorKind::Corrupted)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::PathNotFound(_) => ErrorKind::PathNotFound,
            StoreError::ParentNotFound(_) => ErrorKind::ParentNotFound,
            StoreError::CannotRemoveCollection(_) => ErrorKind::CannotRemoveCollection,
            StoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            StoreError::Corrupted(_) | StoreError::Serialization(_) => ErrorKind::Corrupted,
            StoreError::Crypto(_)
            | StoreError::SignatureInvalid(_)
            | StoreError::DecryptionFailed(_) => ErrorKind::CryptoFailure,
            StoreError::StorageUnavailable(_)
            | StoreError::Database(_)
            | StoreError::Transaction(_)
            | StoreError::Table(_)
            | StoreError::StorageOp(_)
            | StoreError::Commit(_)
            | StoreError::Io(_) => ErrorKind::StorageUnavailable,
        }
    }
}

/// Result type alias using StoreError
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::PathNotFound("ab12".to_string());
        assert_eq!(format!("{}", err), "Path not found: ab12");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
    }

    #[test]
    fn test_crypto_errors_share_a_kind() {
        for err in [
            StoreError::Crypto("x".into()),
            StoreError::SignatureInvalid("x".into()),
            StoreError::DecryptionFailed("x".into()),
        ] {
            assert_eq!(err.kind(), ErrorKind::CryptoFailure);
        }
    }

    #[test]
    fn test_routine_kinds() {
        assert!(ErrorKind::PathNotFound.is_routine());
        assert!(ErrorKind::ParentNotFound.is_routine());
        assert!(ErrorKind::CannotRemoveCollection.is_routine());
        assert!(ErrorKind::CryptoFailure.is_routine());
        assert!(!ErrorKind::StorageUnavailable.is_routine());
        assert_eq!(ErrorKind::ParentNotFound.to_string(), "parent_not_found");
        assert_eq!(
            ErrorKind::parse("cannot_remove_collection"),
            Some(ErrorKind::CannotRemoveCollection)
        );
        assert_eq!(ErrorKind::parse("bogus"), None);
    }
}
