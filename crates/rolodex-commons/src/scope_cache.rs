//! Scope-keyed process cache.
//!
//! One cache instance holds many scopes (namespaces): a scope is either a
//! table name (identity translation) or a `(caller, table)` pair rendered
//! as a string (record cache). Entries are created on first successful
//! lookup, evicted on any mutation of the corresponding row, and lazily
//! repopulated from storage — a miss is never an error.
//!
//! Backed by DashMap for lock-free concurrent access. Concurrent writes to
//! the same key are last-writer-wins; the cache is only ever an
//! optimization over a backing lookup, so a stale entry is tolerated as
//! long as every mutation path invalidates before or alongside its write.

use dashmap::DashMap;

/// A cache namespaced by scope, holding cloneable values per string key.
///
/// Instances are explicit objects injected into the engines rather than
/// ambient globals, so tests get isolation from fresh instances.
#[derive(Debug, Default)]
pub struct ScopeCache<V: Clone> {
    scopes: DashMap<String, DashMap<String, V>>,
}

impl<V: Clone> ScopeCache<V> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            scopes: DashMap::new(),
        }
    }

    /// Unconditional upsert of `(scope, key) -> value`.
    pub fn put(&self, scope: &str, key: &str, value: V) {
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Returns a clone of the cached value, if present. Cloning keeps the
    /// cache's copy private: callers can never mutate a shared entry.
    pub fn get(&self, scope: &str, key: &str) -> Option<V> {
        self.scopes
            .get(scope)
            .and_then(|entries| entries.get(key).map(|v| v.clone()))
    }

    /// Removes one entry, or the entire scope when `key` is None.
    pub fn invalidate(&self, scope: &str, key: Option<&str>) {
        match key {
            Some(key) => {
                if let Some(entries) = self.scopes.get(scope) {
                    entries.remove(key);
                }
            }
            None => {
                self.scopes.remove(scope);
            }
        }
    }

    /// Process-wide reset.
    pub fn clear(&self) {
        self.scopes.clear();
    }

    /// Number of entries in a scope.
    pub fn scope_len(&self, scope: &str) -> usize {
        self.scopes.get(scope).map_or(0, |entries| entries.len())
    }
}

impl<V: Clone + PartialEq> ScopeCache<V> {
    /// Reverse lookup: finds the key mapped to `value` within a scope by a
    /// linear value scan. Scopes are small and short-lived, so this is
    /// acceptable today, but it is a known performance hazard at scale; a
    /// maintained reverse index would not change the contract.
    pub fn key_by_value(&self, scope: &str, value: &V) -> Option<String> {
        self.scopes.get(scope).and_then(|entries| {
            entries
                .iter()
                .find(|entry| entry.value() == value)
                .map(|entry| entry.key().clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_roundtrip() {
        let cache: ScopeCache<i64> = ScopeCache::new();
        assert_eq!(cache.get("contact-uuid-id", "abc"), None);
        cache.put("contact-uuid-id", "abc", 7);
        assert_eq!(cache.get("contact-uuid-id", "abc"), Some(7));
    }

    #[test]
    fn test_put_is_upsert() {
        let cache: ScopeCache<i64> = ScopeCache::new();
        cache.put("s", "k", 1);
        cache.put("s", "k", 2);
        assert_eq!(cache.get("s", "k"), Some(2));
        assert_eq!(cache.scope_len("s"), 1);
    }

    #[test]
    fn test_scopes_are_isolated() {
        let cache: ScopeCache<i64> = ScopeCache::new();
        cache.put("contact-uuid-id", "abc", 7);
        cache.put("address-uuid-id", "abc", 9);
        assert_eq!(cache.get("contact-uuid-id", "abc"), Some(7));
        assert_eq!(cache.get("address-uuid-id", "abc"), Some(9));

        cache.invalidate("contact-uuid-id", Some("abc"));
        assert_eq!(cache.get("contact-uuid-id", "abc"), None);
        // invalidation never crosses scopes
        assert_eq!(cache.get("address-uuid-id", "abc"), Some(9));
    }

    #[test]
    fn test_invalidate_whole_scope() {
        let cache: ScopeCache<i64> = ScopeCache::new();
        cache.put("s", "a", 1);
        cache.put("s", "b", 2);
        cache.invalidate("s", None);
        assert_eq!(cache.scope_len("s"), 0);
    }

    #[test]
    fn test_reverse_lookup_by_value() {
        let cache: ScopeCache<i64> = ScopeCache::new();
        cache.put("contact-uuid-id", "abc", 7);
        cache.put("contact-uuid-id", "def", 8);
        assert_eq!(
            cache.key_by_value("contact-uuid-id", &8),
            Some("def".to_string())
        );
        assert_eq!(cache.key_by_value("contact-uuid-id", &99), None);
    }

    #[test]
    fn test_clear_resets_everything() {
        let cache: ScopeCache<String> = ScopeCache::new();
        cache.put("a", "k", "v".into());
        cache.put("b", "k", "v".into());
        cache.clear();
        assert_eq!(cache.get("a", "k"), None);
        assert_eq!(cache.get("b", "k"), None);
    }
}
