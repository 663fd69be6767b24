//! The table descriptor: fixed per-table rules for ownership, external
//! addressing and search.
//!
//! Every dynamic piece of SQL assembled elsewhere draws its table and
//! column names from this allow-list, never from caller-supplied strings.
//! Centralizing the owner/uid/search derivations here keeps the "users
//! table owns itself" special case in exactly one place.

use crate::errors::{RolodexError, RolodexResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Columns intrinsic to row identity, audit and secrets. They are excluded
/// from column metadata so arbitrary body payloads can never write to them,
/// and `password` never leaves storage.
pub const RESERVED_COLUMNS: &[&str] = &[
    "id",
    "uuid",
    "created_by",
    "created_at",
    "updated_at",
    "deleted_at",
    "password",
];

/// Columns stripped from every record returned to callers.
pub const STRIPPED_COLUMNS: &[&str] = &["id", "password", "created_by", "deleted_at"];

/// The soft-delete marker column.
pub const DELETED_AT: &str = "deleted_at";

/// The audit column bumped on every update.
pub const UPDATED_AT: &str = "updated_at";

/// The application entities served by the data-access layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableName {
    Users,
    Groups,
    Tag,
    Contact,
    Address,
    Org,
}

impl TableName {
    /// All known tables.
    pub const ALL: &'static [TableName] = &[
        Self::Users,
        Self::Groups,
        Self::Tag,
        Self::Contact,
        Self::Address,
        Self::Org,
    ];

    /// The SQL table name. Also used as the key-value partition prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Groups => "groups",
            Self::Tag => "tag",
            Self::Contact => "contact",
            Self::Address => "address",
            Self::Org => "org",
        }
    }

    /// Parses a caller-supplied table name. Unknown names are a client
    /// error, not a panic: table names arrive from the routing layer.
    pub fn parse(name: &str) -> RolodexResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| RolodexError::invalid_input(format!("Unknown table name: {name}")))
    }

    /// The column whose value must equal the caller's id for access to be
    /// permitted. The users table is owned by itself (its own primary key);
    /// every other table carries a `created_by` foreign column.
    pub fn owner_column(&self) -> &'static str {
        match self {
            Self::Users => "id",
            _ => "created_by",
        }
    }

    /// The column external callers address rows by. Name-keyed tables use
    /// their name instead of a UUID.
    pub fn uid_column(&self) -> &'static str {
        match self {
            Self::Tag | Self::Groups => "name",
            _ => "uuid",
        }
    }

    /// The canonical column a search term is compared against when the
    /// caller does not name one: a dedicated `search` column for the richer
    /// entities, the username for users, the name otherwise.
    pub fn search_column(&self) -> &'static str {
        match self {
            Self::Contact | Self::Address => "search",
            Self::Users => "username",
            _ => "name",
        }
    }

    /// True when the uid column is a name rather than a generated UUID.
    pub fn is_name_keyed(&self) -> bool {
        matches!(self, Self::Tag | Self::Groups)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
