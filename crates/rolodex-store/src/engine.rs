//! Key-value CRUD engine.
//!
//! Implements the same logical contract as the relational engine against a
//! partition+sort-key store: the partition is the table, one tenant's rows
//! share a key prefix, and the sort key is the entity's external id.
//! There is no schema introspection — all body fields are written verbatim,
//! and a denormalized `search` attribute is populated from a caller-supplied
//! value or defaulted from the canonical `name` field.

use crate::key_encoding::{encode_key, tenant_prefix};
use crate::storage_trait::{Partition, StorageBackend, StorageError};
use chrono::Utc;
use log::debug;
use rolodex_commons::{
    ExternalId, Record, RolodexError, RolodexResult, SearchOptions, TableName, UserId,
};
use serde_json::Value;
use std::sync::Arc;

/// The denormalized attribute search terms are compared against.
const SEARCH_ATTR: &str = "search";

/// Result of a key-value search. `total` is the number of rows scanned
/// before filtering, `count` the number returned after it — callers must
/// not assume these are equal.
#[derive(Debug, Clone)]
pub struct KvSearch {
    pub count: u64,
    pub total: u64,
    pub results: Vec<Record>,
}

/// Key-value CRUD engine over a pluggable storage backend.
pub struct KvEngine {
    backend: Arc<dyn StorageBackend>,
}

impl KvEngine {
    /// Creates an engine, ensuring a partition exists for every table.
    pub fn new(backend: Arc<dyn StorageBackend>) -> RolodexResult<Self> {
        for table in TableName::ALL {
            backend
                .create_partition(&Partition::new(table.as_str()))
                .map_err(RolodexError::from)?;
        }
        Ok(Self { backend })
    }

    /// Stores a new document. The body is written verbatim plus the derived
    /// `search` attribute and a creation timestamp. An explicit
    /// `search_value` wins; a `search` field in the body comes next; the
    /// canonical `name` field is the last fallback.
    pub fn create(
        &self,
        table: TableName,
        tenant: UserId,
        id: &ExternalId,
        body: &Record,
        search_value: Option<&str>,
    ) -> RolodexResult<()> {
        let mut doc = body.clone();
        apply_search_attr(
            &mut doc,
            search_value.or_else(|| body.get_str(SEARCH_ATTR)),
        );
        doc.insert("created_at", Value::String(Utc::now().to_rfc3339()));

        debug!("kv create table={table} tenant={tenant} id={id}");
        self.write(table, tenant, id, &doc)
    }

    /// Reads one document by tenant and entity id.
    pub fn read(
        &self,
        table: TableName,
        tenant: UserId,
        id: &ExternalId,
    ) -> RolodexResult<Option<Record>> {
        let partition = Partition::new(table.as_str());
        let key = encode_key(tenant.as_i64(), id.as_str());
        let bytes = self.backend.get(&partition, &key).map_err(RolodexError::from)?;
        match bytes {
            Some(bytes) => Ok(Some(decode_doc(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Merges the body over the stored document. A missing row is NotFound:
    /// updates never create.
    pub fn update(
        &self,
        table: TableName,
        tenant: UserId,
        id: &ExternalId,
        body: &Record,
        search_value: Option<&str>,
    ) -> RolodexResult<()> {
        let mut doc = self
            .read(table, tenant, id)?
            .ok_or_else(|| RolodexError::not_found(format!("No entity with id: {id}")))?;

        for (column, value) in body.iter() {
            doc.insert(column.clone(), value.clone());
        }
        apply_search_attr(
            &mut doc,
            search_value.or_else(|| body.get_str(SEARCH_ATTR)),
        );
        doc.insert("updated_at", Value::String(Utc::now().to_rfc3339()));

        debug!("kv update table={table} tenant={tenant} id={id}");
        self.write(table, tenant, id, &doc)
    }

    /// Physically deletes a document. Idempotent.
    pub fn delete(&self, table: TableName, tenant: UserId, id: &ExternalId) -> RolodexResult<()> {
        let partition = Partition::new(table.as_str());
        let key = encode_key(tenant.as_i64(), id.as_str());
        debug!("kv delete table={table} tenant={tenant} id={id}");
        self.backend
            .delete(&partition, &key)
            .map_err(RolodexError::from)
    }

    /// Scans one tenant's rows and filters on the `search` attribute.
    pub fn search(
        &self,
        table: TableName,
        tenant: UserId,
        options: &SearchOptions,
    ) -> RolodexResult<KvSearch> {
        let partition = Partition::new(table.as_str());
        let prefix = tenant_prefix(tenant.as_i64());
        let rows = self
            .backend
            .scan(&partition, Some(&prefix), None)
            .map_err(RolodexError::from)?;

        let total = rows.len() as u64;
        let mut results = Vec::new();
        for (_, bytes) in rows {
            let doc = decode_doc(&bytes)?;
            if matches_search(&doc, options) {
                results.push(doc);
            }
        }

        debug!(
            "kv search table={table} tenant={tenant} scanned={total} matched={}",
            results.len()
        );
        Ok(KvSearch {
            count: results.len() as u64,
            total,
            results,
        })
    }

    fn write(
        &self,
        table: TableName,
        tenant: UserId,
        id: &ExternalId,
        doc: &Record,
    ) -> RolodexResult<()> {
        let partition = Partition::new(table.as_str());
        let key = encode_key(tenant.as_i64(), id.as_str());
        let bytes = serde_json::to_vec(&doc.clone().into_json())
            .map_err(|e| StorageError::Serialization(e.to_string()))
            .map_err(RolodexError::from)?;
        self.backend
            .put(&partition, &key, &bytes)
            .map_err(RolodexError::from)
    }
}

/// Sets the `search` attribute from an explicit value (callers resolve a
/// body-supplied `search` field into it first), falling back to the
/// canonical `name` field. Leaves any stored value alone when neither is
/// available.
fn apply_search_attr(doc: &mut Record, search_value: Option<&str>) {
    let derived = search_value
        .map(str::to_string)
        .or_else(|| doc.get_str("name").map(str::to_string));
    if let Some(value) = derived {
        doc.insert(SEARCH_ATTR, Value::String(value));
    }
}

fn matches_search(doc: &Record, options: &SearchOptions) -> bool {
    let Some(term) = options.search_term.as_deref() else {
        return true;
    };
    let Some(value) = doc.get_str(SEARCH_ATTR) else {
        return false;
    };
    if options.exact_match {
        value == term
    } else {
        value.to_lowercase().contains(&term.to_lowercase())
    }
}

fn decode_doc(bytes: &[u8]) -> RolodexResult<Record> {
    let value: Value = serde_json::from_slice(bytes)?;
    Record::from_json(value)
        .ok_or_else(|| RolodexError::Serialization("stored document is not an object".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::InMemoryBackend;
    use serde_json::json;

    fn engine() -> KvEngine {
        KvEngine::new(Arc::new(InMemoryBackend::new())).unwrap()
    }

    fn record(value: Value) -> Record {
        Record::from_json(value).unwrap()
    }

    #[test]
    fn test_create_then_read_returns_body_fields() {
        let engine = engine();
        let id = ExternalId::from("a1b2");
        engine
            .create(
                TableName::Contact,
                UserId::new(42),
                &id,
                &record(json!({"name": "Alice", "phone": "555"})),
                None,
            )
            .unwrap();

        let doc = engine.read(TableName::Contact, UserId::new(42), &id).unwrap().unwrap();
        assert_eq!(doc.get_str("name"), Some("Alice"));
        assert_eq!(doc.get_str("phone"), Some("555"));
        // search is derived from name when no explicit value is supplied
        assert_eq!(doc.get_str("search"), Some("Alice"));
        assert!(doc.get("created_at").is_some());
    }

    #[test]
    fn test_create_keeps_body_supplied_search_value() {
        let engine = engine();
        let id = ExternalId::from("a1b2");
        engine
            .create(
                TableName::Contact,
                UserId::new(42),
                &id,
                &record(json!({"name": "Alice", "search": "alice smith melbourne"})),
                None,
            )
            .unwrap();

        let doc = engine.read(TableName::Contact, UserId::new(42), &id).unwrap().unwrap();
        // the body's search value must not be clobbered by the name fallback
        assert_eq!(doc.get_str("search"), Some("alice smith melbourne"));
    }

    #[test]
    fn test_explicit_search_value_wins_over_body_field() {
        let engine = engine();
        let id = ExternalId::from("a1b2");
        engine
            .create(
                TableName::Contact,
                UserId::new(42),
                &id,
                &record(json!({"name": "Alice", "search": "from body"})),
                Some("from caller"),
            )
            .unwrap();

        let doc = engine.read(TableName::Contact, UserId::new(42), &id).unwrap().unwrap();
        assert_eq!(doc.get_str("search"), Some("from caller"));
    }

    #[test]
    fn test_update_refreshes_search_from_body_field() {
        let engine = engine();
        let id = ExternalId::from("a1b2");
        engine
            .create(TableName::Contact, UserId::new(42), &id, &record(json!({"name": "Alice"})), None)
            .unwrap();
        engine
            .update(
                TableName::Contact,
                UserId::new(42),
                &id,
                &record(json!({"search": "alice at acme"})),
                None,
            )
            .unwrap();

        let doc = engine.read(TableName::Contact, UserId::new(42), &id).unwrap().unwrap();
        assert_eq!(doc.get_str("search"), Some("alice at acme"));
    }

    #[test]
    fn test_read_is_tenant_scoped() {
        let engine = engine();
        let id = ExternalId::from("a1b2");
        engine
            .create(TableName::Contact, UserId::new(42), &id, &record(json!({"name": "Alice"})), None)
            .unwrap();

        assert!(engine
            .read(TableName::Contact, UserId::new(43), &id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_update_merges_and_refreshes_search() {
        let engine = engine();
        let id = ExternalId::from("a1b2");
        engine
            .create(TableName::Contact, UserId::new(42), &id, &record(json!({"name": "Alice"})), None)
            .unwrap();
        engine
            .update(
                TableName::Contact,
                UserId::new(42),
                &id,
                &record(json!({"name": "Alicia"})),
                None,
            )
            .unwrap();

        let doc = engine.read(TableName::Contact, UserId::new(42), &id).unwrap().unwrap();
        assert_eq!(doc.get_str("name"), Some("Alicia"));
        assert_eq!(doc.get_str("search"), Some("Alicia"));
        assert!(doc.get("updated_at").is_some());
    }

    #[test]
    fn test_update_missing_row_is_not_found() {
        let engine = engine();
        let err = engine
            .update(
                TableName::Contact,
                UserId::new(42),
                &ExternalId::from("nope"),
                &record(json!({"name": "x"})),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, RolodexError::NotFound(_)));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let engine = engine();
        let id = ExternalId::from("a1b2");
        engine
            .create(TableName::Contact, UserId::new(42), &id, &record(json!({"name": "Alice"})), None)
            .unwrap();
        engine.delete(TableName::Contact, UserId::new(42), &id).unwrap();
        engine.delete(TableName::Contact, UserId::new(42), &id).unwrap();
        assert!(engine.read(TableName::Contact, UserId::new(42), &id).unwrap().is_none());
    }

    #[test]
    fn test_search_count_vs_total_divergence() {
        let engine = engine();
        for (id, name) in [("a", "Alice"), ("b", "Bob"), ("c", "alina")] {
            engine
                .create(
                    TableName::Contact,
                    UserId::new(42),
                    &ExternalId::from(id),
                    &record(json!({"name": name})),
                    None,
                )
                .unwrap();
        }
        // another tenant's rows never enter the scan
        engine
            .create(
                TableName::Contact,
                UserId::new(9),
                &ExternalId::from("z"),
                &record(json!({"name": "Alfred"})),
                None,
            )
            .unwrap();

        let found = engine
            .search(
                TableName::Contact,
                UserId::new(42),
                &SearchOptions {
                    search_term: Some("ali".into()),
                    ..SearchOptions::all()
                },
            )
            .unwrap();

        assert_eq!(found.total, 3);
        assert_eq!(found.count, 2);
        assert_eq!(found.results.len(), 2);
    }

    #[test]
    fn test_search_exact_match() {
        let engine = engine();
        engine
            .create(
                TableName::Contact,
                UserId::new(42),
                &ExternalId::from("a"),
                &record(json!({"name": "Alice"})),
                Some("alice smith"),
            )
            .unwrap();

        let exact = |term: &str| SearchOptions {
            search_term: Some(term.into()),
            exact_match: true,
            ..SearchOptions::all()
        };

        assert_eq!(
            engine
                .search(TableName::Contact, UserId::new(42), &exact("alice smith"))
                .unwrap()
                .count,
            1
        );
        assert_eq!(
            engine
                .search(TableName::Contact, UserId::new(42), &exact("alice"))
                .unwrap()
                .count,
            0
        );
    }
}
