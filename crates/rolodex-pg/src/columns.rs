//! Column metadata introspection and caching.
//!
//! The first caller for a table pays the `information_schema` lookup;
//! everyone after gets the memoized snapshot. The schema is assumed static
//! for a process's life, so entries are never invalidated.

use deadpool_postgres::Pool;
use log::debug;
use rolodex_commons::models::table_name::RESERVED_COLUMNS;
use rolodex_commons::{RolodexError, RolodexResult, ScopeCache, TableName};
use std::sync::Arc;

/// Cache scope for introspected column metadata.
const SCOPE: &str = "table-columns";

/// One storage column, excluding internal bookkeeping columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub nullable: bool,
    pub data_type: String,
}

/// Process-lifetime catalog of per-table column metadata.
pub struct ColumnCatalog {
    pool: Pool,
    cache: ScopeCache<Arc<Vec<ColumnMeta>>>,
}

impl ColumnCatalog {
    /// Creates a catalog over the given pool with an empty cache.
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            cache: ScopeCache::new(),
        }
    }

    /// Returns the writable columns of a table. A table with zero columns
    /// is a misconfiguration, reported as NotFound.
    pub async fn columns(&self, table: TableName) -> RolodexResult<Arc<Vec<ColumnMeta>>> {
        if let Some(cached) = self.cache.get(SCOPE, table.as_str()) {
            return Ok(cached);
        }

        let client = self
            .pool
            .get()
            .await
            .map_err(|e| RolodexError::storage(e.to_string()))?;
        let rows = client
            .query(
                "select column_name, is_nullable, data_type from information_schema.columns where table_name = $1",
                &[&table.as_str()],
            )
            .await
            .map_err(|e| RolodexError::storage(e.to_string()))?;

        if rows.is_empty() {
            return Err(RolodexError::not_found(format!(
                "Table has no columns: {table}"
            )));
        }

        let all: Vec<ColumnMeta> = rows
            .iter()
            .map(|row| ColumnMeta {
                name: row.get("column_name"),
                nullable: row.get::<_, &str>("is_nullable") == "YES",
                data_type: row.get("data_type"),
            })
            .collect();
        let writable = Arc::new(filter_reserved(all));

        debug!("introspected {} writable columns for {table}", writable.len());
        self.cache.put(SCOPE, table.as_str(), Arc::clone(&writable));
        Ok(writable)
    }
}

/// Drops the columns intrinsic to row identity, audit and secrets; the
/// query builder must never allow direct writes to them through arbitrary
/// body payloads.
pub fn filter_reserved(columns: Vec<ColumnMeta>) -> Vec<ColumnMeta> {
    columns
        .into_iter()
        .filter(|c| !RESERVED_COLUMNS.contains(&c.name.as_str()))
        .collect()
}
