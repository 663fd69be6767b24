//! Search, sorting and pagination types shared by both backends.

use crate::models::record::Record;
use serde::{Deserialize, Serialize};

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// The SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Parses a caller-supplied direction; anything unrecognized falls back
    /// to ascending rather than erroring.
    pub fn parse(s: &str) -> Self {
        match s {
            "desc" => Self::Desc,
            _ => Self::Asc,
        }
    }
}

/// Options for list/search operations. Pagination is zero-indexed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Term to filter rows by; absent means no search predicate.
    #[serde(default)]
    pub search_term: Option<String>,
    /// Column the term is compared against. Defaults to the table's
    /// canonical search column; silently ignored when not a known column.
    #[serde(default)]
    pub search_column: Option<String>,
    /// Exact equality when true, case-insensitive substring match otherwise.
    #[serde(default)]
    pub exact_match: bool,
    /// Column to sort by, validated against column metadata; an
    /// unrecognized column is silently ignored.
    #[serde(default)]
    pub sort_column: Option<String>,
    /// Sort direction; ascending when absent.
    #[serde(default)]
    pub sort_direction: Option<SortDirection>,
    /// Rows per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Zero-indexed page number.
    #[serde(default)]
    pub page: u32,
}

fn default_page_size() -> u32 {
    20
}

impl SearchOptions {
    /// Options with no filtering, default page size, first page.
    pub fn all() -> Self {
        Self {
            page_size: default_page_size(),
            ..Self::default()
        }
    }

    /// Exact-match search on a named column, used for internal child
    /// lookups (e.g. addresses by `contact_id`).
    pub fn exact(column: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            search_term: Some(term.into()),
            search_column: Some(column.into()),
            exact_match: true,
            page_size: default_page_size(),
            ..Self::default()
        }
    }
}

/// A page of results from the relational engine.
///
/// Invariant: `pages == ceil(total / page_size)` and the count query shares
/// its filter predicate with the listing query, so summing result lengths
/// across pages equals `total`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPage {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub pages: u32,
    pub results: Vec<Record>,
}

impl ListPage {
    /// An empty page (total of zero).
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            total: 0,
            page,
            page_size,
            pages: 0,
            results: Vec::new(),
        }
    }

    /// Page count for a total at a given page size.
    pub fn page_count(total: u64, page_size: u32) -> u32 {
        if page_size == 0 {
            return 0;
        }
        total.div_ceil(u64::from(page_size)) as u32
    }
}

/// The unified search response exposed by the facade. Both engines fill the
/// same shape: the relational engine sets `count = results.len()` and the
/// page arithmetic; the key-value engine reports one page where `total` is
/// the number of rows scanned before filtering and `count` the number
/// returned after it — callers must not assume the two are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total: u64,
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    pub pages: u32,
    pub results: Vec<Record>,
}

impl From<ListPage> for SearchResponse {
    fn from(page: ListPage) -> Self {
        Self {
            total: page.total,
            count: page.results.len() as u64,
            page: page.page,
            page_size: page.page_size,
            pages: page.pages,
            results: page.results,
        }
    }
}

/// One entry of the enumerated type catalog used for client-side
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    pub value: String,
}
