//! Entity composition over the relational engine.
//!
//! Stored rows reference each other by internal numeric keys; the API
//! surface only ever sees external identifiers. This mapper rewrites
//! reference columns in both directions and materializes the one nested
//! relationship the model has: a contact owns its addresses.
//!
//! Relational-only. Key-value documents store their references denormalized
//! and never need translation.

use log::debug;
use rolodex_commons::{
    ExternalId, InternalId, Record, RolodexError, RolodexResult, SearchOptions, TableName, UserId,
};
use rolodex_pg::RelationalEngine;
use serde_json::Value;
use std::sync::Arc;

/// Body attribute carrying nested child addresses on a contact.
const ADDRESSES_ATTR: &str = "addresses";

/// Reference columns and the table each one points at.
const REFERENCE_COLUMNS: &[(&str, TableName)] = &[
    ("contact_id", TableName::Contact),
    ("address_id", TableName::Address),
];

pub struct CompositionMapper {
    engine: Arc<RelationalEngine>,
}

impl CompositionMapper {
    pub fn new(engine: Arc<RelationalEngine>) -> Self {
        Self { engine }
    }

    /// Shapes a stored record for the API: reference columns become
    /// external identifiers, and a contact gets its owned addresses
    /// attached under `addresses`.
    pub async fn to_api(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
        record: Record,
    ) -> RolodexResult<Record> {
        let mut record = self.externalize_references(caller, record).await?;

        if table == TableName::Contact {
            let contact = self.engine.internal_id(table, caller, uid).await?;
            let page = self
                .engine
                .list(
                    TableName::Address,
                    caller,
                    &SearchOptions::exact("contact_id", contact.to_string()),
                )
                .await?;
            let mut addresses = Vec::with_capacity(page.results.len());
            for child in page.results {
                let child = self.externalize_references(caller, child).await?;
                addresses.push(child.into_json());
            }
            debug!(
                "attached {} addresses to contact {uid}",
                addresses.len()
            );
            record.insert(ADDRESSES_ATTR, Value::Array(addresses));
        }

        Ok(record)
    }

    /// Prepares an API body for storage: reference columns become internal
    /// keys. A reference to no live entity is invalid input; a reference
    /// to someone else's entity stays a permission error.
    pub async fn to_db(&self, caller: UserId, mut body: Record) -> RolodexResult<Record> {
        for &(column, target) in REFERENCE_COLUMNS {
            let Some(uid) = body.get_str(column).map(str::to_string) else {
                continue;
            };
            let id = self
                .engine
                .internal_id(target, caller, &ExternalId::new(uid.clone()))
                .await
                .map_err(|e| reference_error(column, &uid, e))?;
            body.insert(column, Value::from(id.as_i64()));
        }
        Ok(body)
    }

    /// Upserts the nested addresses a contact body carried, after the
    /// contact row itself was written. Children with a `uuid` are updated,
    /// the rest created, each with `contact_id` pointing at the parent.
    pub async fn after_write(
        &self,
        table: TableName,
        caller: UserId,
        uid: &ExternalId,
        body: &Record,
    ) -> RolodexResult<()> {
        if table != TableName::Contact {
            return Ok(());
        }
        let Some(Value::Array(children)) = body.get(ADDRESSES_ATTR) else {
            return Ok(());
        };

        let contact = self.engine.internal_id(table, caller, uid).await?;
        for child in children.clone() {
            let mut child = Record::from_json(child).ok_or_else(|| {
                RolodexError::invalid_input("Each address must be an object")
            })?;
            child.insert("contact_id", Value::from(contact.as_i64()));

            match child.remove("uuid") {
                Some(Value::String(child_uid)) => {
                    let child_uid = ExternalId::new(child_uid);
                    self.engine
                        .update(TableName::Address, caller, &child_uid, &child)
                        .await?;
                }
                _ => {
                    self.engine.create(TableName::Address, caller, &child).await?;
                }
            }
        }
        Ok(())
    }

    /// Translates a list of tag or group names into internal identifiers.
    /// Those tables are keyed by name, so each name is its external id.
    pub async fn resolve_names(
        &self,
        table: TableName,
        caller: UserId,
        names: &[String],
    ) -> RolodexResult<Vec<InternalId>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let id = self
                .engine
                .internal_id(table, caller, &ExternalId::new(name.clone()))
                .await?;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Rewrites every reference column present on the record from an
    /// internal key to the external identifier.
    async fn externalize_references(
        &self,
        caller: UserId,
        mut record: Record,
    ) -> RolodexResult<Record> {
        for &(column, target) in REFERENCE_COLUMNS {
            let Some(id) = record.get(column).and_then(Value::as_i64) else {
                continue;
            };
            let uid = self
                .engine
                .external_id(target, caller, InternalId::new(id))
                .await?;
            record.insert(column, Value::String(uid.to_string()));
        }
        Ok(record)
    }
}

/// Classifies a failed reference lookup. A missing row means the caller
/// sent a dangling reference (invalid input); ownership and storage
/// failures propagate unchanged.
fn reference_error(column: &str, uid: &str, e: RolodexError) -> RolodexError {
    match e {
        RolodexError::NotFound(_) => {
            RolodexError::invalid_input(format!("Invalid {column}: {uid}"))
        }
        other => other,
    }
}
