//! Storage backend abstraction for pluggable key-value implementations.
//!
//! A `Partition` is a logical namespace for one table's data. Backends map
//! it to their native concept: a RocksDB column family, or a HashMap
//! namespace for the in-memory test backend.

use rolodex_commons::RolodexError;
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Partition (column family, namespace) not found
    #[error("Partition not found: {0}")]
    PartitionNotFound(String),

    /// Generic I/O error from the underlying storage
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other errors
    #[error("Storage error: {0}")]
    Other(String),
}

impl From<StorageError> for RolodexError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Serialization(msg) => RolodexError::Serialization(msg),
            other => RolodexError::Storage(other.to_string()),
        }
    }
}

/// A logical partition of data within a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    name: String,
}

impl Partition {
    /// Creates a new partition with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the partition name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Partition {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Trait for pluggable storage backend implementations.
///
/// Implementations must be thread-safe (Send + Sync); the backend is shared
/// across concurrent requests behind an `Arc`.
pub trait StorageBackend: Send + Sync {
    /// Retrieves a value by key. Returns `Ok(None)` when the key is absent.
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Stores a key-value pair; an existing key is overwritten.
    fn put(&self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()>;

    /// Deletes a key. Idempotent: deleting an absent key is `Ok(())`.
    fn delete(&self, partition: &Partition, key: &[u8]) -> Result<()>;

    /// Scans keys in a partition in lexicographic order, optionally
    /// restricted to a prefix and capped at `limit` entries.
    fn scan(
        &self,
        partition: &Partition,
        prefix: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Creates a partition. Idempotent.
    fn create_partition(&self, partition: &Partition) -> Result<()>;

    /// Checks whether a partition exists.
    fn partition_exists(&self, partition: &Partition) -> bool;
}
