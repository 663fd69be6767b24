//! The generic row representation shared by both backends.

use crate::models::table_name::STRIPPED_COLUMNS;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A generic entity row: a mapping of column name to JSON value, used
/// uniformly by create/read/update responses on both backends.
///
/// BTreeMap keeps serialization order stable for clients and tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from a JSON object. Non-object values are an error
    /// at the storage boundary, so this returns None for them.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self {
                values: map.into_iter().collect(),
            }),
            _ => None,
        }
    }

    /// Returns the value for a column, if present.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Sets a column value.
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.values.insert(column.into(), value);
    }

    /// Removes a column value.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.values.remove(column)
    }

    /// Returns the string value of a column, if it is a string.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.values.get(column).and_then(Value::as_str)
    }

    /// Number of columns present.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no columns are present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over (column, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Column names present in the record.
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Strips the columns that must never reach a caller: the internal
    /// primary key, password-like secrets, the owner column and the
    /// soft-delete marker.
    pub fn strip_internal(mut self) -> Self {
        for col in STRIPPED_COLUMNS {
            self.values.remove(*col);
        }
        self
    }

    /// Converts back into a JSON object value.
    pub fn into_json(self) -> Value {
        Value::Object(self.values.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
