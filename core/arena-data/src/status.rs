//! Observable hook state.

use arena_store::StoreError;

/// Lifecycle of a [`Mutation`](crate::Mutation).
///
/// `Idle -> Saving -> {Success, Errored}`. Only `clear()` (or a
/// [`DismissTimer`](crate::DismissTimer)) leaves a terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Success,
    Errored(StoreError),
}

impl SaveStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_saving(&self) -> bool {
        matches!(self, Self::Saving)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn error(&self) -> Option<&StoreError> {
        match self {
            Self::Errored(err) => Some(err),
            _ => None,
        }
    }
}

/// Tri-state result of a read: loading flag, error code, data.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub is_loading: bool,
    pub error_code: Option<String>,
    pub data: Option<T>,
}

impl<T> FetchState<T> {
    /// Not loading, nothing loaded.
    pub fn idle() -> Self {
        Self {
            is_loading: false,
            error_code: None,
            data: None,
        }
    }

    pub fn loading() -> Self {
        Self {
            is_loading: true,
            error_code: None,
            data: None,
        }
    }

    pub fn loaded(data: Option<T>) -> Self {
        Self {
            is_loading: false,
            error_code: None,
            data,
        }
    }

    pub fn failed(err: &StoreError) -> Self {
        Self {
            is_loading: false,
            error_code: Some(err.code()),
            data: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_code.is_some()
    }
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self::idle()
    }
}
