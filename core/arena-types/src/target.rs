use serde::{Deserialize, Serialize};

/// What a single-item fetch should load.
///
/// Hooks are constructed unconditionally; `Disabled` is how a caller says
/// "not yet" (no id known, user not signed in) without a fake id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "id", rename_all = "snake_case")]
pub enum FetchTarget {
    #[default]
    Disabled,
    Pending(String),
}

impl FetchTarget {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Pending(id.into())
    }

    /// Empty ids count as disabled.
    pub fn from_option(id: Option<impl Into<String>>) -> Self {
        let id: Option<String> = id.map(Into::into);
        match id {
            Some(id) if !id.is_empty() => Self::Pending(id),
            _ => Self::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn as_id(&self) -> Option<&str> {
        match self {
            Self::Pending(id) => Some(id),
            Self::Disabled => None,
        }
    }
}

impl From<Option<String>> for FetchTarget {
    fn from(id: Option<String>) -> Self {
        Self::from_option(id)
    }
}

impl From<&str> for FetchTarget {
    fn from(id: &str) -> Self {
        Self::from_option(Some(id))
    }
}
