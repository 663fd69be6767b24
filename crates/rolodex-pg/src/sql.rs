//! Parameterized statement builders.
//!
//! Every function here produces SQL whose table and column names are drawn
//! exclusively from the `TableName` descriptor and introspected column
//! metadata — never from caller-supplied strings — and whose values are
//! bound as parameters. This is the injection boundary of the whole crate.
//!
//! External-id comparisons cast the column to text (`{uid}::text = $n`) so
//! the same statement shape works whether the column is a native `uuid` or
//! a name.

use crate::columns::ColumnMeta;
use rolodex_commons::models::table_name::{DELETED_AT, UPDATED_AT};
use rolodex_commons::{
    ExternalId, Record, RolodexError, RolodexResult, SearchOptions, SortDirection, TableName,
    UserId,
};
use serde_json::Value;
use tokio_postgres::types::ToSql;

/// The liveness predicate: a row is live until its soft-delete marker is
/// set and in the past.
pub fn liveness_clause() -> String {
    format!("({DELETED_AT} is null or {DELETED_AT} > now())")
}

/// A bound statement value. Converted from JSON body fields; each variant
/// maps onto the matching postgres wire type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Json(Value),
}

impl SqlValue {
    /// Converts a JSON body value into a bindable value. Returns None for
    /// null and empty-string values: those are treated as absent and never
    /// written (false and zero are real values and are kept).
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i))
                } else {
                    n.as_f64().map(Self::Float)
                }
            }
            Value::Array(_) | Value::Object(_) => Some(Self::Json(value.clone())),
        }
    }

    /// Borrows the value as a tokio-postgres parameter.
    pub fn as_to_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            Self::Text(v) => v,
            Self::Int(v) => v,
            Self::Float(v) => v,
            Self::Bool(v) => v,
            Self::Json(v) => v,
        }
    }
}

/// A statement plus its bound values, ready for execution.
#[derive(Debug, Clone)]
pub struct BuiltStatement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

impl BuiltStatement {
    /// Borrows the values as a tokio-postgres parameter slice.
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values.iter().map(SqlValue::as_to_sql).collect()
    }
}

/// Builds the insert statement: the owner column is always set to the
/// caller's id, and only body fields matching live column metadata with a
/// non-empty value are included.
pub fn build_insert(
    table: TableName,
    caller: UserId,
    columns: &[ColumnMeta],
    body: &Record,
) -> RolodexResult<BuiltStatement> {
    let mut column_names = vec![table.owner_column().to_string()];
    let mut placeholders = vec!["$1".to_string()];
    let mut values = vec![SqlValue::Int(caller.as_i64())];

    for column in columns {
        if let Some(value) = body.get(&column.name).and_then(SqlValue::from_json) {
            values.push(value);
            placeholders.push(format!("${}", values.len()));
            column_names.push(column.name.clone());
        }
    }

    if values.len() == 1 {
        return Err(RolodexError::invalid_input(format!(
            "No data to insert for {table}"
        )));
    }

    let sql = format!(
        "insert into {table} ({}) values ({}) returning {}::text",
        column_names.join(","),
        placeholders.join(","),
        table.uid_column(),
    );
    Ok(BuiltStatement { sql, values })
}

/// Builds the update statement: the audit marker is always bumped, and at
/// least one real column must be set for the update to be worth issuing.
pub fn build_update(
    table: TableName,
    caller: UserId,
    uid: &ExternalId,
    columns: &[ColumnMeta],
    body: &Record,
) -> RolodexResult<BuiltStatement> {
    let mut assignments = vec![format!("{UPDATED_AT} = now()")];
    let mut values = vec![
        SqlValue::Int(caller.as_i64()),
        SqlValue::Text(uid.as_str().to_string()),
    ];

    for column in columns {
        if let Some(value) = body.get(&column.name).and_then(SqlValue::from_json) {
            values.push(value);
            assignments.push(format!("{} = ${}", column.name, values.len()));
        }
    }

    if values.len() == 2 {
        return Err(RolodexError::invalid_input(format!(
            "No data to update for {table}"
        )));
    }

    let sql = format!(
        "update {table} set {} where {} = $1 and {}::text = $2 returning {}::text",
        assignments.join(","),
        table.owner_column(),
        table.uid_column(),
        table.uid_column(),
    );
    Ok(BuiltStatement { sql, values })
}

/// The single-row read, wrapped in `row_to_json` so arbitrary column types
/// come back as one JSON object.
pub fn build_get(table: TableName) -> String {
    format!(
        "select row_to_json(t.*) as row from (select * from {table} where {} = $1 and {}::text = $2) t",
        table.owner_column(),
        table.uid_column(),
    )
}

/// The soft delete: sets the marker to now, making the row dead to the
/// liveness predicate immediately.
pub fn build_soft_delete(table: TableName) -> String {
    format!(
        "update {table} set {DELETED_AT} = now() where {} = $1 and {}::text = $2 returning {}::text",
        table.owner_column(),
        table.uid_column(),
        table.uid_column(),
    )
}

/// The physical delete.
pub fn build_hard_delete(table: TableName) -> String {
    format!(
        "delete from {table} where {} = $1 and {}::text = $2",
        table.owner_column(),
        table.uid_column(),
    )
}

/// Resolves the column a search term is compared against: the caller's
/// choice when it names a known column, the table's canonical search column
/// otherwise. Falling back (rather than interpolating the caller's string)
/// keeps the column name on the allow-list.
fn resolve_search_column<'a>(
    table: TableName,
    columns: &'a [ColumnMeta],
    requested: Option<&'a str>,
) -> &'a str {
    match requested {
        Some(name) if columns.iter().any(|c| c.name == name) => name,
        _ => table.search_column(),
    }
}

/// The optional `and {col} = $2` / `and {col} ilike $2` fragment plus its
/// bound term.
fn search_fragment(
    table: TableName,
    columns: &[ColumnMeta],
    options: &SearchOptions,
) -> (String, Option<SqlValue>) {
    let Some(term) = options.search_term.as_deref() else {
        return (String::new(), None);
    };
    let column = resolve_search_column(table, columns, options.search_column.as_deref());
    if options.exact_match {
        // Bind with the column's type: internal reference columns are
        // numeric, and postgres will not compare bigint against text.
        let numeric = columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| matches!(c.data_type.as_str(), "bigint" | "integer" | "smallint"))
            .unwrap_or(false);
        let value = match term.parse::<i64>() {
            Ok(n) if numeric => SqlValue::Int(n),
            _ => SqlValue::Text(term.to_string()),
        };
        (format!(" and {column} = $2"), Some(value))
    } else {
        (
            format!(" and {column} ilike $2"),
            Some(SqlValue::Text(format!("%{term}%"))),
        )
    }
}

/// The `order by` fragment. An unrecognized sort column is silently
/// ignored rather than rejected (kept reference behavior); the direction
/// defaults to ascending.
fn sort_fragment(columns: &[ColumnMeta], options: &SearchOptions) -> String {
    let Some(requested) = options.sort_column.as_deref() else {
        return String::new();
    };
    if !columns.iter().any(|c| c.name == requested) {
        return String::new();
    }
    let direction = options.sort_direction.unwrap_or(SortDirection::Asc);
    format!(" order by {requested} {}", direction.as_sql())
}

/// Builds the count statement. Its filter predicate is identical to the
/// listing query so page arithmetic stays consistent with listed rows.
pub fn build_count(
    table: TableName,
    caller: UserId,
    columns: &[ColumnMeta],
    options: &SearchOptions,
) -> BuiltStatement {
    let (search, term) = search_fragment(table, columns, options);
    let mut values = vec![SqlValue::Int(caller.as_i64())];
    values.extend(term);

    let sql = format!(
        "select count(1) as count from {table} where {} = $1{search} and {}",
        table.owner_column(),
        liveness_clause(),
    );
    BuiltStatement { sql, values }
}

/// Builds the bounded listing query. Offset and limit are computed from
/// validated numeric page options (zero-indexed pages), never from strings.
pub fn build_list(
    table: TableName,
    caller: UserId,
    columns: &[ColumnMeta],
    options: &SearchOptions,
) -> BuiltStatement {
    let (search, term) = search_fragment(table, columns, options);
    let sort = sort_fragment(columns, options);
    let mut values = vec![SqlValue::Int(caller.as_i64())];
    values.extend(term);

    let offset = u64::from(options.page) * u64::from(options.page_size);
    let limit = options.page_size;

    let sql = format!(
        "select row_to_json(t.*) as row from (select * from {table} where {} = $1{search} and {}{sort} offset {offset} limit {limit}) t",
        table.owner_column(),
        liveness_clause(),
    );
    BuiltStatement { sql, values }
}
