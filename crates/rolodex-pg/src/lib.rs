//! Relational (PostgreSQL) backend for Rolodex.
//!
//! The engine here is schema-driven: column metadata is introspected live
//! from `information_schema`, cached for the process lifetime, and used as
//! the allow-list for every dynamically assembled statement. Callers
//! address rows by opaque external identifiers; internal numeric keys never
//! leave this crate.
//!
//! ## Architecture
//!
//! ```text
//! RelationalEngine         ← CRUD orchestration + caches (engine.rs)
//!     ↓
//! OwnershipValidator       ← owner check before every access (validate.rs)
//! IdentityMap              ← uuid ↔ id translation (identity.rs)
//! ColumnCatalog            ← introspected column metadata (columns.rs)
//! sql::*                   ← parameterized statement builders (sql.rs)
//!     ↓
//! deadpool-postgres pool   ← bounded connections (pool.rs)
//! ```

pub mod columns;
pub mod engine;
pub mod identity;
pub mod pool;
pub mod sql;
pub mod validate;

pub use columns::{ColumnCatalog, ColumnMeta};
pub use engine::RelationalEngine;
pub use identity::IdentityMap;
pub use pool::{create_pool, DbSecret, PoolSettings};
pub use sql::{BuiltStatement, SqlValue};
