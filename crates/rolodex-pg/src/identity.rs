//! External-id ↔ internal-id translation.
//!
//! External callers never observe internal numeric identifiers: they are
//! an implementation detail of this backend and are not stable across row
//! re-creation. Internal join predicates and some legacy columns need them,
//! so this map translates in both directions, caching per table scope and
//! falling back to storage transparently on a miss.

use deadpool_postgres::Pool;
use log::debug;
use rolodex_commons::{
    ExternalId, InternalId, RolodexError, RolodexResult, ScopeCache, TableName, UserId,
};

use crate::validate::assert_owned;

/// Bidirectional identity translation with a per-table cache scope.
pub struct IdentityMap {
    cache: ScopeCache<i64>,
}

impl IdentityMap {
    /// Creates a map with an empty cache.
    pub fn new() -> Self {
        Self {
            cache: ScopeCache::new(),
        }
    }

    fn scope(table: TableName) -> String {
        format!("{table}-uuid-id")
    }

    /// Translates an external id to the internal key, validating ownership
    /// on the way. The validation query already resolves the internal id,
    /// so the cache entry is refreshed as a side effect.
    pub async fn internal_id(
        &self,
        pool: &Pool,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
    ) -> RolodexResult<InternalId> {
        let id = assert_owned(pool, table, caller, uid).await?;
        self.cache.put(&Self::scope(table), uid.as_str(), id.as_i64());
        Ok(id)
    }

    /// Translates an internal id back to the external identifier, by cache
    /// reverse scan first, then by query. The query is owner-filtered;
    /// internal ids only exist inside trusted join paths.
    pub async fn external_id(
        &self,
        pool: &Pool,
        table: TableName,
        caller: UserId,
        id: InternalId,
    ) -> RolodexResult<ExternalId> {
        if let Some(uid) = self.cache.key_by_value(&Self::scope(table), &id.as_i64()) {
            return Ok(ExternalId::new(uid));
        }

        let sql = format!(
            "select {}::text as uid from {table} where {} = $1 and id = $2",
            table.uid_column(),
            table.owner_column(),
        );
        let client = pool
            .get()
            .await
            .map_err(|e| RolodexError::storage(e.to_string()))?;
        let rows = client
            .query(&sql, &[&caller.as_i64(), &id.as_i64()])
            .await
            .map_err(|e| RolodexError::storage(e.to_string()))?;

        let Some(row) = rows.first() else {
            return Err(RolodexError::not_found(format!(
                "No {table} entity with internal id: {id}"
            )));
        };
        let uid: String = row.get("uid");
        debug!("resolved {table} internal id {id} to external id");
        self.cache.put(&Self::scope(table), &uid, id.as_i64());
        Ok(ExternalId::new(uid))
    }

    /// Inserts a translation directly, bypassing storage.
    #[cfg(test)]
    pub(crate) fn seed(&self, table: TableName, uid: &ExternalId, id: i64) {
        self.cache.put(&Self::scope(table), uid.as_str(), id);
    }

    /// Returns the cached internal id without touching storage.
    pub fn cached(&self, table: TableName, uid: &ExternalId) -> Option<InternalId> {
        self.cache
            .get(&Self::scope(table), uid.as_str())
            .map(InternalId::new)
    }

    /// Evicts the entry for one row. Mutation paths call this before
    /// issuing their write; invalidation never crosses table scopes.
    pub fn invalidate(&self, table: TableName, uid: &ExternalId) {
        self.cache.invalidate(&Self::scope(table), Some(uid.as_str()));
    }

    /// Process-wide reset.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

impl Default for IdentityMap {
    fn default() -> Self {
        Self::new()
    }
}
