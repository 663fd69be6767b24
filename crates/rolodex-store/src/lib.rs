//! Key-value storage backend for Rolodex.
//!
//! The logical CRUD contract is satisfied here by a partition+sort-key
//! store: the partition isolates one tenant's rows for one table, the sort
//! key is the entity's external identifier, and documents are JSON objects
//! written verbatim (no schema introspection).
//!
//! ## Architecture
//!
//! ```text
//! KvEngine                 ← tenant-scoped CRUD + search (engine.rs)
//!     ↓
//! StorageBackend           ← generic K/V operations (storage_trait.rs)
//!     ↓
//! RocksDB / in-memory      ← concrete backends
//! ```

pub mod engine;
pub mod key_encoding;
pub mod rocksdb_impl;
pub mod storage_trait;
pub mod test_utils;

pub use engine::{KvEngine, KvSearch};
pub use rocksdb_impl::RocksDbBackend;
pub use storage_trait::{Partition, StorageBackend, StorageError};
pub use test_utils::InMemoryBackend;
