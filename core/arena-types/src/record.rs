use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{TypesError, TypesResult};

/// A partial field map, as sent in a write or returned in a row.
pub type Fields = serde_json::Map<String, Value>;

/// A row from a remote collection.
///
/// Every record carries a server-assigned `id`. The remaining columns are
/// kept as raw JSON; relations arrive as plain id strings or as nested
/// objects populated by server-side views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    /// Builds a record from an id and its columns.
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Splits a JSON row into a record, pulling `id` out of the columns.
    ///
    /// Numeric ids are accepted and rendered as strings.
    pub fn from_value(value: Value) -> TypesResult<Self> {
        let mut fields = match value {
            Value::Object(map) => map,
            other => return Err(TypesError::NotAnObject(type_name(&other).to_string())),
        };
        let id = match fields.remove("id") {
            Some(Value::String(id)) => id,
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(TypesError::MissingId),
        };
        Ok(Self { id, fields })
    }

    /// Returns the record as a single JSON object including `id`.
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert("id".into(), Value::String(self.id.clone()));
        Value::Object(map)
    }

    /// Raw column value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Extract a string value using a JSON pointer (e.g., "/author/username").
    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.lookup(pointer).and_then(|v| v.as_str())
    }

    /// Extract a boolean value using a JSON pointer.
    pub fn get_bool(&self, pointer: &str) -> Option<bool> {
        self.lookup(pointer).and_then(|v| v.as_bool())
    }

    /// Extract a numeric value using a JSON pointer.
    pub fn get_number(&self, pointer: &str) -> Option<f64> {
        self.lookup(pointer).and_then(|v| v.as_f64())
    }

    /// Soft-delete state: `isdeleted == true` or `accessstatus == "deleted"`.
    pub fn is_deleted(&self) -> bool {
        self.get_bool("/isdeleted").unwrap_or(false)
            || self.access_status() == Some(AccessStatus::Deleted)
    }

    /// Parsed `accessstatus` column, if present and recognised.
    pub fn access_status(&self) -> Option<AccessStatus> {
        self.get_str("/accessstatus").and_then(AccessStatus::parse)
    }

    fn lookup(&self, pointer: &str) -> Option<&Value> {
        let rest = pointer.strip_prefix('/')?;
        match rest.split_once('/') {
            Some((head, tail)) => self.fields.get(head)?.pointer(&format!("/{tail}")),
            None => self.fields.get(rest),
        }
    }
}

/// Visibility of a listing or profile, stored in `accessstatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    Public,
    Private,
    Deleted,
}

impl AccessStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Deleted => "deleted",
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
