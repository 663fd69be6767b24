//! Test utilities for rolodex-store.
//!
//! Provides an in-memory `StorageBackend` so engine behavior can be tested
//! without touching disk.

use crate::storage_trait::{Partition, Result, StorageBackend, StorageError};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory storage backend: one ordered map per partition.
///
/// BTreeMap gives the same lexicographic key ordering RocksDB iterators
/// provide, so scan semantics match the real backend.
#[derive(Default)]
pub struct InMemoryBackend {
    partitions: RwLock<BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend with the given partitions pre-created.
    pub fn with_partitions(names: &[&str]) -> Self {
        let backend = Self::new();
        for name in names {
            backend.create_partition(&Partition::new(*name)).unwrap();
        }
        backend
    }
}

impl StorageBackend for InMemoryBackend {
    fn get(&self, partition: &Partition, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let partitions = self.partitions.read().unwrap();
        let entries = partitions
            .get(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, partition: &Partition, key: &[u8], value: &[u8]) -> Result<()> {
        let mut partitions = self.partitions.write().unwrap();
        let entries = partitions
            .get_mut(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))?;
        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, partition: &Partition, key: &[u8]) -> Result<()> {
        let mut partitions = self.partitions.write().unwrap();
        let entries = partitions
            .get_mut(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))?;
        entries.remove(key);
        Ok(())
    }

    fn scan(
        &self,
        partition: &Partition,
        prefix: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let partitions = self.partitions.read().unwrap();
        let entries = partitions
            .get(partition.name())
            .ok_or_else(|| StorageError::PartitionNotFound(partition.name().to_string()))?;

        let mut results = Vec::new();
        for (key, value) in entries.iter() {
            if let Some(p) = prefix {
                if !key.starts_with(p) {
                    continue;
                }
            }
            results.push((key.clone(), value.clone()));
            if let Some(limit) = limit {
                if results.len() >= limit {
                    break;
                }
            }
        }
        Ok(results)
    }

    fn create_partition(&self, partition: &Partition) -> Result<()> {
        let mut partitions = self.partitions.write().unwrap();
        partitions.entry(partition.name().to_string()).or_default();
        Ok(())
    }

    fn partition_exists(&self, partition: &Partition) -> bool {
        self.partitions
            .read()
            .unwrap()
            .contains_key(partition.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_roundtrip() {
        let backend = InMemoryBackend::with_partitions(&["contact"]);
        let partition = Partition::new("contact");

        backend.put(&partition, b"42#a", b"1").unwrap();
        assert_eq!(backend.get(&partition, b"42#a").unwrap(), Some(b"1".to_vec()));

        backend.delete(&partition, b"42#a").unwrap();
        assert_eq!(backend.get(&partition, b"42#a").unwrap(), None);
    }

    #[test]
    fn test_in_memory_scan_prefix_and_limit() {
        let backend = InMemoryBackend::with_partitions(&["contact"]);
        let partition = Partition::new("contact");
        for sort in ["a", "b", "c"] {
            backend
                .put(&partition, format!("42#{sort}").as_bytes(), b"{}")
                .unwrap();
        }
        backend.put(&partition, b"9#a", b"{}").unwrap();

        let rows = backend.scan(&partition, Some(b"42#"), Some(2)).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|(k, _)| k.starts_with(b"42#")));
    }

    #[test]
    fn test_unknown_partition() {
        let backend = InMemoryBackend::new();
        let err = backend.get(&Partition::new("contact"), b"k").unwrap_err();
        assert!(matches!(err, StorageError::PartitionNotFound(_)));
    }
}
