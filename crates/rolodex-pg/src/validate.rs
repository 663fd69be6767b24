//! Ownership validation.
//!
//! Confirms a row's owning principal matches the caller before any access
//! that takes an external id. Runs before every read, update and delete;
//! intentionally skipped for creation (there is no row to own yet) and for
//! reverse lookups by internal id used in trusted internal joins.

use deadpool_postgres::Pool;
use rolodex_commons::{ExternalId, InternalId, RolodexError, RolodexResult, TableName, UserId};

use crate::sql::liveness_clause;

/// Resolves the live row addressed by `uid`, asserts the caller owns it,
/// and returns its internal identifier.
///
/// Failure semantics are deliberate and distinct: no live row → NotFound
/// (soft-deleted rows are indistinguishable from absent ones); a live row
/// owned by someone else → PermissionDenied, never NotFound.
pub async fn assert_owned(
    pool: &Pool,
    table: TableName,
    caller: UserId,
    uid: &ExternalId,
) -> RolodexResult<InternalId> {
    // The users table owns itself; its id doubles as the owner value.
    let owner_select = if table == TableName::Users {
        String::new()
    } else {
        format!(", {}", table.owner_column())
    };
    let sql = format!(
        "select id{owner_select} from {table} where {}::text = $1 and {}",
        table.uid_column(),
        liveness_clause(),
    );

    let client = pool
        .get()
        .await
        .map_err(|e| RolodexError::storage(e.to_string()))?;
    let rows = client
        .query(&sql, &[&uid.as_str()])
        .await
        .map_err(|e| RolodexError::storage(e.to_string()))?;

    let row = rows.first().map(|row| OwnerRow {
        id: row.get("id"),
        owner: if table == TableName::Users {
            None
        } else {
            Some(row.get(table.owner_column()))
        },
    });
    check_owned(table, caller, uid, row)
}

/// The values the ownership query resolves for a live row: the internal
/// id, and the stored owner for tables that have a separate owner column.
#[derive(Debug, Clone, Copy)]
struct OwnerRow {
    id: i64,
    /// None for the users table, whose id doubles as the owner value.
    owner: Option<i64>,
}

/// The ownership decision itself, separated from the round-trip. No live
/// row is NotFound (a soft-deleted row is indistinguishable from an absent
/// one); a live row owned by someone else is PermissionDenied.
fn check_owned(
    table: TableName,
    caller: UserId,
    uid: &ExternalId,
    row: Option<OwnerRow>,
) -> RolodexResult<InternalId> {
    let Some(row) = row else {
        return Err(RolodexError::not_found(format!("No entity with id: {uid}")));
    };
    let owner = row.owner.unwrap_or(row.id);
    if owner != caller.as_i64() {
        return Err(RolodexError::permission_denied(format!(
            "Caller {caller} does not own {table} entity"
        )));
    }
    Ok(InternalId::new(row.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_or_dead_row_is_not_found() {
        let err = check_owned(
            TableName::Contact,
            UserId::new(42),
            &ExternalId::from("abc"),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RolodexError::NotFound(_)));
    }

    #[test]
    fn test_foreign_owner_is_permission_denied_not_not_found() {
        let row = OwnerRow {
            id: 9,
            owner: Some(7),
        };
        let err = check_owned(
            TableName::Contact,
            UserId::new(42),
            &ExternalId::from("abc"),
            Some(row),
        )
        .unwrap_err();
        assert!(matches!(err, RolodexError::PermissionDenied(_)));
    }

    #[test]
    fn test_owner_match_returns_internal_id() {
        let row = OwnerRow {
            id: 9,
            owner: Some(42),
        };
        let id = check_owned(
            TableName::Contact,
            UserId::new(42),
            &ExternalId::from("abc"),
            Some(row),
        )
        .unwrap();
        assert_eq!(id, InternalId::new(9));
    }

    #[test]
    fn test_users_row_owns_itself() {
        let row = OwnerRow { id: 42, owner: None };
        let id = check_owned(
            TableName::Users,
            UserId::new(42),
            &ExternalId::from("abc"),
            Some(row),
        )
        .unwrap();
        assert_eq!(id, InternalId::new(42));

        let err = check_owned(
            TableName::Users,
            UserId::new(43),
            &ExternalId::from("abc"),
            Some(row),
        )
        .unwrap_err();
        assert!(matches!(err, RolodexError::PermissionDenied(_)));
    }
}
