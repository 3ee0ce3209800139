//! Guard against clients writing server-managed audit columns.

use crate::{Fields, TypesError, TypesResult};

/// Canonical (lowercase, no separator) names of the audit columns.
pub const AUDIT_FIELDS: [&str; 4] = ["createdat", "createdby", "lastmodifiedat", "lastmodifiedby"];

/// Returns true if `name` is an audit column in any camel/snake/upper variant.
///
/// `createdAt`, `created_at`, `CREATED_AT` and `createdat` all match.
pub fn is_audit_field(name: &str) -> bool {
    let canonical: String = name
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();
    AUDIT_FIELDS.contains(&canonical.as_str())
}

/// Fails with [`TypesError::ServerManagedField`] on the first audit column found.
pub fn check_audit_fields(fields: &Fields) -> TypesResult<()> {
    match fields.keys().find(|key| is_audit_field(key)) {
        Some(key) => Err(TypesError::ServerManagedField(key.clone())),
        None => Ok(()),
    }
}
