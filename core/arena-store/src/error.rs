//! Error types for the store layer.

use arena_types::TypesError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Postgres SQLSTATE for `unique_violation`.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Errors that can occur talking to a backing store.
///
/// Cloneable so hook state can hold on to the last failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Request never produced a usable response.
    #[error("network error: {0}")]
    Transport(String),

    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {message}")]
    UniqueViolation {
        message: String,
        hint: Option<String>,
    },

    /// Any other error reported by the database.
    #[error("database error {code}: {message}")]
    Database {
        code: String,
        message: String,
        hint: Option<String>,
    },

    /// Update or delete matched no row.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A server-side callable function failed.
    #[error("function `{name}` failed: {message}")]
    Function { name: String, message: String },

    /// File upload rejected before or during transfer.
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl StoreError {
    /// Builds an error from a backend `code` / `message` / `hint` triple,
    /// singling out unique violations.
    pub fn from_parts(code: impl Into<String>, message: impl Into<String>, hint: Option<String>) -> Self {
        let code = code.into();
        let message = message.into();
        if code == UNIQUE_VIOLATION_CODE {
            Self::UniqueViolation { message, hint }
        } else {
            Self::Database {
                code,
                message,
                hint,
            }
        }
    }

    /// Short machine-readable code, shown to users as "(code N)".
    pub fn code(&self) -> String {
        match self {
            Self::Transport(_) => "network".to_string(),
            Self::UniqueViolation { .. } => UNIQUE_VIOLATION_CODE.to_string(),
            Self::Database { code, .. } => code.clone(),
            Self::NotFound(_) => "not_found".to_string(),
            Self::Serialization(_) => "serialization".to_string(),
            Self::Function { .. } => "function".to_string(),
            Self::Upload(e) => e.code().to_string(),
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::UniqueViolation { hint, .. } | Self::Database { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }

    /// Generic user-facing failure line, e.g. "Failed to save asset (code 23505)".
    pub fn user_message(&self, action: &str) -> String {
        format!("Failed to {action} (code {})", self.code())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<TypesError> for StoreError {
    fn from(err: TypesError) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Upload validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("file is {size} bytes, limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("file type `{0}` is not allowed")]
    DisallowedType(String),

    /// Path traversal, or the storage backend refused the origin/credentials.
    #[error("upload blocked: {0}")]
    Security(String),
}

impl UploadError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooLarge { .. } => "file_too_large",
            Self::DisallowedType(_) => "file_type_not_allowed",
            Self::Security(_) => "upload_blocked",
        }
    }
}
