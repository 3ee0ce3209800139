//! Core type definitions for the Arena data layer.
//!
//! This crate defines the backend-agnostic types every other crate speaks:
//! - [`Record`]: a server-assigned id plus a JSON field map
//! - [`SelectQuery`] / [`QueryResult`]: what to read and what comes back
//! - [`FetchTarget`]: whether a single-item fetch should run at all
//! - the audit-field guard that keeps server-managed columns out of writes
//!
//! Nothing here performs I/O.

mod audit;
mod query;
mod record;
mod target;

pub use audit::{AUDIT_FIELDS, check_audit_fields, is_audit_field};
pub use query::{Filter, Order, QueryResult, SelectQuery};
pub use record::{AccessStatus, Fields, Record};
pub use target::FetchTarget;

/// Result type alias using the crate's error type.
pub type TypesResult<T> = std::result::Result<T, TypesError>;

/// Errors that can occur when building or reading records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// The caller tried to write a column only the server may set.
    #[error("field `{0}` is server-managed and cannot be set by the client")]
    ServerManagedField(String),

    #[error("record has no `id` field")]
    MissingId,

    #[error("expected a JSON object, got {0}")]
    NotAnObject(String),
}
