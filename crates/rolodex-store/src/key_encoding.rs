//! Composite key encoding for the partition+sort-key model.
//!
//! Within a table's partition, one tenant's rows share the prefix
//! `{tenant}#`, and the sort key is the entity's external identifier.
//! `#` never occurs in either component: tenants are numeric ids and sort
//! keys are dashless UUIDs or validated names.

/// Encodes a full key: `{tenant}#{sort_key}`.
pub fn encode_key(tenant: i64, sort_key: &str) -> Vec<u8> {
    format!("{tenant}#{sort_key}").into_bytes()
}

/// The scan prefix covering every row of one tenant.
pub fn tenant_prefix(tenant: i64) -> Vec<u8> {
    format!("{tenant}#").into_bytes()
}

/// Splits a stored key back into (tenant, sort_key).
pub fn decode_key(key: &[u8]) -> Option<(i64, String)> {
    let key = std::str::from_utf8(key).ok()?;
    let (tenant, sort_key) = key.split_once('#')?;
    Some((tenant.parse().ok()?, sort_key.to_string()))
}
