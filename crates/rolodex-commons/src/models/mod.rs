//! Data model shared across both storage backends.

pub mod record;
pub mod search;
pub mod table_name;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe wrapper for the caller's principal identifier.
///
/// Numeric for the relational backend (it is the `users.id` primary key);
/// the key-value backend renders it as the partition key. Ensures caller
/// ids cannot be accidentally swapped with row ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(i64);

impl UserId {
    /// Creates a new UserId.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// The identifier a caller uses to address a row: a UUID for most tables,
/// the row's name for name-keyed tables (tags, groups). Stable across
/// re-creation of internal storage; never exposes sequence ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalId(String);

impl ExternalId {
    /// Creates a new ExternalId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ExternalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ExternalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ExternalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The storage-level primary key. Used only inside the relational engine
/// for joins and ownership checks; never serialized to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InternalId(i64);

impl InternalId {
    /// Creates a new InternalId.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for InternalId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
