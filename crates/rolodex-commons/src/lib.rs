//! Shared models, errors and cache primitives for Rolodex.
//!
//! This crate holds everything both storage backends need to agree on:
//! the table descriptor (which column owns a row, which column external
//! callers address it by), typed identifier wrappers, the generic record
//! representation, search options, the error taxonomy, and the scope-keyed
//! cache used for identity translation and record caching.

pub mod errors;
pub mod models;
pub mod scope_cache;

pub use errors::{RolodexError, RolodexResult};
pub use models::record::Record;
pub use models::search::{ListPage, SearchOptions, SearchResponse, SortDirection, TypeEntry};
pub use models::table_name::TableName;
pub use models::{ExternalId, InternalId, UserId};
pub use scope_cache::ScopeCache;

/// Generates an external identifier: a v4 UUID without dashes, with an
/// optional prefix (e.g. `C-a1b2c3...`).
pub fn generate_external_id(prefix: &str) -> String {
    format!("{}{}", prefix, uuid::Uuid::new_v4().simple())
}
