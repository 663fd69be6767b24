//! Relational CRUD engine.
//!
//! Orchestrates the column catalog, ownership validator, identity map and
//! statement builders into the five logical operations plus the type
//! catalog. Every operation is a short pipeline, not a long-lived state
//! machine: validate ownership → translate identity → execute → shape →
//! update caches.
//!
//! Caches are explicit injected objects (fresh instances per engine), so a
//! test or a second deployment never shares state by accident.

use deadpool_postgres::Pool;
use log::debug;
use rolodex_commons::{
    ExternalId, InternalId, ListPage, Record, RolodexError, RolodexResult, ScopeCache,
    SearchOptions, TableName, TypeEntry, UserId,
};
use serde_json::Value;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;

use crate::columns::ColumnCatalog;
use crate::identity::IdentityMap;
use crate::sql;
use crate::validate::assert_owned;

/// Fixed scope and key for the process-wide enum type catalog; enum
/// definitions are schema-static.
const TYPES_SCOPE: &str = "types";
const TYPES_KEY: &str = "ALL";

/// Relational CRUD engine over a bounded connection pool.
pub struct RelationalEngine {
    pool: Pool,
    catalog: ColumnCatalog,
    identity: IdentityMap,
    records: ScopeCache<Record>,
    types: ScopeCache<Vec<TypeEntry>>,
}

impl RelationalEngine {
    /// Creates an engine with fresh caches over the given pool.
    pub fn new(pool: Pool) -> Self {
        Self {
            catalog: ColumnCatalog::new(pool.clone()),
            identity: IdentityMap::new(),
            records: ScopeCache::new(),
            types: ScopeCache::new(),
            pool,
        }
    }

    /// The record-cache scope for one caller's view of one table.
    fn record_scope(caller: UserId, table: TableName) -> String {
        format!("{caller}-get-{table}")
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> RolodexResult<Vec<Row>> {
        debug!("sql: {sql}");
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| RolodexError::storage(e.to_string()))?;
        let rows = client
            .query(sql, params)
            .await
            .map_err(|e| RolodexError::storage(e.to_string()))?;
        debug!("rows: {}", rows.len());
        Ok(rows)
    }

    fn row_to_record(row: &Row) -> RolodexResult<Record> {
        let value: Value = row.get("row");
        Record::from_json(value)
            .ok_or_else(|| RolodexError::Serialization("row did not decode to an object".into()))
    }

    /// Inserts a new row owned by the caller and returns its generated
    /// external identifier — and nothing else.
    pub async fn create(
        &self,
        table: TableName,
        caller: UserId,
        body: &Record,
    ) -> RolodexResult<ExternalId> {
        let columns = self.catalog.columns(table).await?;
        let stmt = sql::build_insert(table, caller, &columns, body)?;
        let rows = self.execute(&stmt.sql, &stmt.params()).await?;
        let row = rows
            .first()
            .ok_or_else(|| RolodexError::Internal(format!("insert into {table} returned no row")))?;
        Ok(ExternalId::new(row.get::<_, String>(0)))
    }

    /// Reads one row, ownership-checked, shaped, served from the record
    /// cache when possible. The cache stores its own copy and hands out
    /// clones, never a shared mutable reference.
    pub async fn get(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
    ) -> RolodexResult<Record> {
        assert_owned(&self.pool, table, caller, uid).await?;

        let scope = Self::record_scope(caller, table);
        if let Some(record) = self.records.get(&scope, uid.as_str()) {
            return Ok(record);
        }

        let rows = self
            .execute(&sql::build_get(table), &[&caller.as_i64(), &uid.as_str()])
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| RolodexError::not_found(format!("No entity with id: {uid}")))?;
        let record = Self::row_to_record(row)?.strip_internal();
        self.records.put(&scope, uid.as_str(), record.clone());
        Ok(record)
    }

    /// Lists the caller's rows with search, sorting and pagination. The
    /// count query shares its predicate with the listing query, so the
    /// page arithmetic always agrees with the listed rows.
    pub async fn list(
        &self,
        table: TableName,
        caller: UserId,
        options: &SearchOptions,
    ) -> RolodexResult<ListPage> {
        let columns = self.catalog.columns(table).await?;

        let count_stmt = sql::build_count(table, caller, &columns, options);
        let rows = self.execute(&count_stmt.sql, &count_stmt.params()).await?;
        let total = rows
            .first()
            .map(|row| row.get::<_, i64>("count"))
            .unwrap_or(0)
            .max(0) as u64;

        if total == 0 {
            return Ok(ListPage::empty(options.page, options.page_size));
        }

        let list_stmt = sql::build_list(table, caller, &columns, options);
        let rows = self.execute(&list_stmt.sql, &list_stmt.params()).await?;

        let scope = Self::record_scope(caller, table);
        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let record = Self::row_to_record(row)?.strip_internal();
            if let Some(uid) = record.get_str(table.uid_column()) {
                self.records.put(&scope, uid, record.clone());
            }
            results.push(record);
        }

        Ok(ListPage {
            total,
            page: options.page,
            page_size: options.page_size,
            pages: ListPage::page_count(total, options.page_size),
            results,
        })
    }

    /// Updates a row. The record and identity cache entries for this row
    /// are invalidated before the statement is issued, so a partially
    /// failed update can never leave stale data being served — but an
    /// empty payload is rejected first and touches no cache at all.
    pub async fn update(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
        body: &Record,
    ) -> RolodexResult<ExternalId> {
        assert_owned(&self.pool, table, caller, uid).await?;
        let columns = self.catalog.columns(table).await?;
        let stmt = sql::build_update(table, caller, uid, &columns, body)?;

        self.invalidate_row(table, caller, uid);
        let rows = self.execute(&stmt.sql, &stmt.params()).await?;
        let row = rows
            .first()
            .ok_or_else(|| RolodexError::not_found(format!("No entity with id: {uid}")))?;
        Ok(ExternalId::new(row.get::<_, String>(0)))
    }

    /// Marks a row deleted. The liveness predicate in the validator means a
    /// second soft delete of the same row fails NotFound.
    pub async fn soft_delete(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
    ) -> RolodexResult<()> {
        assert_owned(&self.pool, table, caller, uid).await?;
        self.invalidate_row(table, caller, uid);
        self.execute(
            &sql::build_soft_delete(table),
            &[&caller.as_i64(), &uid.as_str()],
        )
        .await?;
        Ok(())
    }

    /// Physically deletes a row.
    pub async fn hard_delete(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
    ) -> RolodexResult<()> {
        assert_owned(&self.pool, table, caller, uid).await?;
        self.invalidate_row(table, caller, uid);
        self.execute(
            &sql::build_hard_delete(table),
            &[&caller.as_i64(), &uid.as_str()],
        )
        .await?;
        Ok(())
    }

    /// Returns the enumerated type catalog used for client-side
    /// validation, cached process-wide.
    pub async fn get_types(&self) -> RolodexResult<Vec<TypeEntry>> {
        if let Some(types) = self.types.get(TYPES_SCOPE, TYPES_KEY) {
            return Ok(types);
        }
        let rows = self
            .execute(
                "select pg_type.typname as name, pg_enum.enumlabel as value from pg_type join pg_enum on pg_enum.enumtypid = pg_type.oid",
                &[],
            )
            .await?;
        let types: Vec<TypeEntry> = rows
            .iter()
            .map(|row| TypeEntry {
                name: row.get("name"),
                value: row.get("value"),
            })
            .collect();
        self.types.put(TYPES_SCOPE, TYPES_KEY, types.clone());
        Ok(types)
    }

    /// Translates an external id to the internal key (ownership-checked).
    pub async fn internal_id(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
    ) -> RolodexResult<InternalId> {
        self.identity.internal_id(&self.pool, table, caller, uid).await
    }

    /// Translates an internal id back to the external identifier.
    pub async fn external_id(
        &self,
        table: TableName,
        caller: UserId,
        id: InternalId,
    ) -> RolodexResult<ExternalId> {
        self.identity.external_id(&self.pool, table, caller, id).await
    }

    /// Drops the record and identity entries for one row. Invalidation is
    /// deliberately per-scope: mutating a contact does not touch the
    /// addresses that reference it — callers who know the relationship
    /// handle that themselves.
    fn invalidate_row(&self, table: TableName, caller: UserId, uid: &ExternalId) {
        self.records
            .invalidate(&Self::record_scope(caller, table), Some(uid.as_str()));
        self.identity.invalidate(table, uid);
    }

    /// Process-wide cache reset.
    pub fn reset_caches(&self) {
        self.records.clear();
        self.identity.clear();
        self.types.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{create_pool, DbSecret, PoolSettings};
    use serde_json::json;

    fn engine() -> RelationalEngine {
        // Pools are lazy; no live database is needed to exercise the
        // cache objects.
        let secret = DbSecret {
            username: "rolodex".into(),
            password: "rolodex".into(),
            dbname: "rolodex".into(),
            host: "localhost".into(),
            port: 5432,
        };
        RelationalEngine::new(create_pool(&secret, &PoolSettings::default()).unwrap())
    }

    #[tokio::test]
    async fn test_invalidate_row_evicts_record_and_identity_entries() {
        let engine = engine();
        let caller = UserId::new(42);
        let uid = ExternalId::from("abc");

        let scope = RelationalEngine::record_scope(caller, TableName::Contact);
        let record = Record::from_json(json!({"uuid": "abc", "name": "Alice"})).unwrap();
        engine.records.put(&scope, uid.as_str(), record);
        engine.identity.seed(TableName::Contact, &uid, 9);

        // writes evict before the statement is issued, so a failed write
        // can never leave these entries serving stale data
        engine.invalidate_row(TableName::Contact, caller, &uid);

        assert!(engine.records.get(&scope, uid.as_str()).is_none());
        assert_eq!(engine.identity.cached(TableName::Contact, &uid), None);
    }

    #[tokio::test]
    async fn test_invalidate_row_is_scoped_to_one_caller_and_table() {
        let engine = engine();
        let uid = ExternalId::from("abc");
        let other_scope = RelationalEngine::record_scope(UserId::new(43), TableName::Contact);
        let record = Record::from_json(json!({"uuid": "abc"})).unwrap();
        engine.records.put(&other_scope, uid.as_str(), record);

        engine.invalidate_row(TableName::Contact, UserId::new(42), &uid);

        assert!(engine.records.get(&other_scope, uid.as_str()).is_some());
    }

    #[test]
    fn test_record_scope_separates_callers_and_tables() {
        let a = RelationalEngine::record_scope(UserId::new(42), TableName::Contact);
        let b = RelationalEngine::record_scope(UserId::new(43), TableName::Contact);
        let c = RelationalEngine::record_scope(UserId::new(42), TableName::Address);
        assert_eq!(a, "42-get-contact");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
