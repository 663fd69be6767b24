//! RocksDB implementation of the StorageBackend trait.
//!
//! Partitions map to RocksDB column families. The multi-threaded handle is
//! used so column families can be created on a shared reference.

use crate::storage_trait::{Partition, Result, StorageBackend, StorageError};
use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options};
use std::path::Path;
use std::sync::Arc;

type Db = DBWithThreadMode<MultiThreaded>;

/// RocksDB implementation of the StorageBackend trait.
pub struct RocksDbBackend {
    db: Arc<Db>,
}

impl RocksDbBackend {
    /// Opens (or creates) a database at `path` with the given partitions.
    pub fn open(path: impl AsRef<Path>, partitions: &[&str]) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let db = Db::open_cf(&opts, path, partitions)
            .map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Creates a backend over an already-open database handle.
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    fn cf(
        &self,
        partition: &Partition,
    ) -> Result<Arc<rocksdb::BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))
    }
}

impl StorageBackend for RocksDbBackend {
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(partition)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    fn put(&self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.cf(partition)?;
        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    fn delete(&self, partition: &Partition, key: &[u8]) -> Result<()> {
        let cf = self.cf(partition)?;
        self.db
            .delete_cf(&cf, key)
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    fn scan(
        &self,
        partition: &Partition,
        prefix: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let cf = self.cf(partition)?;
        let mode = match prefix {
            Some(p) => IteratorMode::From(p, Direction::Forward),
            None => IteratorMode::Start,
        };

        let mut results = Vec::new();
        for item in self.db.iterator_cf(&cf, mode) {
            let (key, value) = item.map_err(|e| StorageError::Io(e.to_string()))?;
            if let Some(p) = prefix {
                if !key.starts_with(p) {
                    break;
                }
            }
            results.push((key.to_vec(), value.to_vec()));
            if let Some(limit) = limit {
                if results.len() >= limit {
                    break;
                }
            }
        }
        Ok(results)
    }

    fn create_partition(&self, partition: &Partition) -> Result<()> {
        if self.partition_exists(partition) {
            return Ok(());
        }
        self.db
            .create_cf(partition.name(), &Options::default())
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    fn partition_exists(&self, partition: &Partition) -> bool {
        self.db.cf_handle(partition.name()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_backend(dir: &TempDir) -> RocksDbBackend {
        RocksDbBackend::open(dir.path(), &["contact"]).unwrap()
    }

    #[test]
    fn test_put_get_delete() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(&dir);
        let partition = Partition::new("contact");

        backend.put(&partition, b"42#abc", b"{}").unwrap();
        assert_eq!(backend.get(&partition, b"42#abc").unwrap(), Some(b"{}".to_vec()));

        backend.delete(&partition, b"42#abc").unwrap();
        assert_eq!(backend.get(&partition, b"42#abc").unwrap(), None);
        // idempotent delete
        backend.delete(&partition, b"42#abc").unwrap();
    }

    #[test]
    fn test_scan_respects_prefix_boundary() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(&dir);
        let partition = Partition::new("contact");

        backend.put(&partition, b"42#a", b"1").unwrap();
        backend.put(&partition, b"42#b", b"2").unwrap();
        backend.put(&partition, b"43#a", b"3").unwrap();

        let rows = backend.scan(&partition, Some(b"42#"), None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, b"42#a".to_vec());
    }

    #[test]
    fn test_missing_partition_errors() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(&dir);
        let err = backend.get(&Partition::new("nope"), b"k").unwrap_err();
        assert!(matches!(err, StorageError::PartitionNotFound(_)));
    }

    #[test]
    fn test_create_partition_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let backend = open_backend(&dir);
        let partition = Partition::new("address");
        backend.create_partition(&partition).unwrap();
        backend.create_partition(&partition).unwrap();
        assert!(backend.partition_exists(&partition));
    }
}
