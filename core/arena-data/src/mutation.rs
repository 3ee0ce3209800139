//! Create-or-update / delete against one collection.

use crate::reporter::ErrorReporter;
use crate::status::SaveStatus;
use crate::timer::DismissTimer;
use arena_store::{DataStore, StoreError};
use arena_types::{Fields, Record, TypesError, check_audit_fields};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Result type for mutations.
pub type MutationResult<T> = Result<T, MutationError>;

/// Why a [`Mutation::save`] did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    /// The caller tried to set an audit column. Nothing was sent.
    #[error("field `{0}` is server-managed and cannot be set by the client")]
    ServerManagedField(String),

    /// Insert/update called without a field map. Nothing was sent.
    #[error("fields are required to insert or update")]
    MissingFields,

    /// Delete-mode mutation with no bound or explicit id. Nothing was sent.
    #[error("delete requires a target id")]
    MissingId,

    /// The store rejected or never answered the request.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MutationError {
    /// True for mistakes in the calling code rather than runtime failures.
    pub fn is_programmer_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }

    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TypesError> for MutationError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::ServerManagedField(field) => Self::ServerManagedField(field),
            other => Self::Store(other.into()),
        }
    }
}

/// Whether a known target id means update or delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutationMode {
    #[default]
    Upsert,
    Delete,
}

enum Operation {
    Insert(Fields),
    Update(String, Fields),
    Delete(String),
}

/// One collection, one optional bound id, one observable status.
///
/// `save` may be called concurrently; each call issues its own request and
/// the status reflects whichever response lands last.
pub struct Mutation {
    store: Arc<dyn DataStore>,
    table: String,
    bound_id: Option<String>,
    mode: MutationMode,
    status: Arc<watch::Sender<SaveStatus>>,
    reporter: Option<Arc<ErrorReporter>>,
}

impl Mutation {
    pub fn new(store: Arc<dyn DataStore>, table: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(SaveStatus::Idle);
        Self {
            store,
            table: table.into(),
            bound_id: None,
            mode: MutationMode::Upsert,
            status: Arc::new(tx),
            reporter: None,
        }
    }

    /// Binds the record this mutation updates (or deletes).
    pub fn bound_to(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.bound_id = (!id.is_empty()).then_some(id);
        self
    }

    /// Switches to delete mode.
    pub fn deleting(mut self) -> Self {
        self.mode = MutationMode::Delete;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn bound_id(&self) -> Option<&str> {
        self.bound_id.as_deref()
    }

    pub fn mode(&self) -> MutationMode {
        self.mode
    }

    /// Inserts, updates or deletes one record.
    ///
    /// With a target id (explicit, else bound) this updates, or deletes in
    /// delete mode; without one it inserts. Inserts return the created
    /// record; updates and deletes return an empty vector.
    pub async fn save(&self, fields: Option<Fields>, explicit_id: Option<&str>) -> MutationResult<Vec<Record>> {
        let target = explicit_id
            .filter(|id| !id.is_empty())
            .or(self.bound_id.as_deref())
            .map(str::to_owned);

        let operation = match (self.mode, target, fields) {
            (MutationMode::Delete, Some(id), _) => Operation::Delete(id),
            (MutationMode::Delete, None, _) => return Err(MutationError::MissingId),
            (MutationMode::Upsert, _, None) => return Err(MutationError::MissingFields),
            (MutationMode::Upsert, target, Some(fields)) => {
                check_audit_fields(&fields)?;
                match target {
                    Some(id) => Operation::Update(id, fields),
                    None => Operation::Insert(fields),
                }
            }
        };

        self.execute(operation).await
    }

    /// Flags a record as deleted without removing the row.
    ///
    /// Always an update, also on a delete-mode mutation. An empty `id`
    /// falls back to the bound id.
    pub async fn soft_delete(&self, id: &str) -> MutationResult<Vec<Record>> {
        let id = Some(id)
            .filter(|id| !id.is_empty())
            .or(self.bound_id.as_deref())
            .ok_or(MutationError::MissingId)?;
        let mut fields = Fields::new();
        fields.insert("isdeleted".into(), Value::Bool(true));
        self.execute(Operation::Update(id.to_owned(), fields)).await
    }

    async fn execute(&self, operation: Operation) -> MutationResult<Vec<Record>> {
        self.status.send_replace(SaveStatus::Saving);

        let outcome = match operation {
            Operation::Insert(fields) => {
                debug!("inserting into {}", self.table);
                self.store.insert(&self.table, fields).await.map(|record| vec![record])
            }
            Operation::Update(id, fields) => {
                debug!("updating {}/{}", self.table, id);
                self.store.update(&self.table, &id, fields).await.map(|()| Vec::new())
            }
            Operation::Delete(id) => {
                debug!("deleting {}/{}", self.table, id);
                self.store.delete(&self.table, &id).await.map(|()| Vec::new())
            }
        };

        match outcome {
            Ok(records) => {
                self.status.send_replace(SaveStatus::Success);
                Ok(records)
            }
            Err(err) => {
                warn!("save to {} failed: {}", self.table, err);
                if let Some(reporter) = &self.reporter {
                    reporter.report(&err);
                }
                self.status.send_replace(SaveStatus::Errored(err.clone()));
                Err(err.into())
            }
        }
    }

    /// Returns to `Idle` from any state.
    pub fn clear(&self) {
        self.status.send_replace(SaveStatus::Idle);
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn is_saving(&self) -> bool {
        self.status.borrow().is_saving()
    }

    pub fn is_success(&self) -> bool {
        self.status.borrow().is_success()
    }

    pub fn last_error(&self) -> Option<StoreError> {
        self.status.borrow().error().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    /// Clears a `Success` status `delay` after it appears, until the
    /// returned timer is dropped.
    pub fn dismiss_after(&self, delay: Duration) -> DismissTimer {
        DismissTimer::spawn(self.status.clone(), delay)
    }
}
