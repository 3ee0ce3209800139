//! Single-record fetch.

use crate::reporter::ErrorReporter;
use crate::status::FetchState;
use arena_store::DataStore;
use arena_types::{FetchTarget, Record};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Loads at most one record by id, or nothing at all when disabled.
///
/// Failures are reported through `error_code`; `fetch` itself never fails.
pub struct ItemFetch {
    store: Arc<dyn DataStore>,
    table: String,
    select: String,
    target: FetchTarget,
    state: watch::Sender<FetchState<Record>>,
    reporter: Option<Arc<ErrorReporter>>,
}

impl ItemFetch {
    pub fn new(store: Arc<dyn DataStore>, table: impl Into<String>, target: impl Into<FetchTarget>) -> Self {
        let target = target.into();
        let (tx, _) = watch::channel(initial_state(&target));
        Self {
            store,
            table: table.into(),
            select: "*".to_string(),
            target,
            state: tx,
            reporter: None,
        }
    }

    /// Column list or embedded-resource select used for the read.
    pub fn with_select(mut self, select: impl Into<String>) -> Self {
        self.select = select.into();
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn target(&self) -> &FetchTarget {
        &self.target
    }

    /// Points the fetch at a different record (or disables it) and resets
    /// state. Does not fetch.
    pub fn retarget(&mut self, target: impl Into<FetchTarget>) {
        self.target = target.into();
        self.state.send_replace(initial_state(&self.target));
    }

    pub fn state(&self) -> FetchState<Record> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<Record>> {
        self.state.subscribe()
    }

    /// Runs the fetch. A disabled target settles to not-loading with no
    /// record and never touches the store.
    pub async fn fetch(&self) -> FetchState<Record> {
        let Some(id) = self.target.as_id() else {
            self.state.send_replace(FetchState::idle());
            return FetchState::idle();
        };

        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error_code = None;
        });
        debug!("fetching {}/{}", self.table, id);

        let next = match self.store.select_one(&self.table, id, &self.select).await {
            Ok(record) => FetchState::loaded(record),
            Err(err) => {
                warn!("failed to fetch {}/{}: {}", self.table, id, err);
                if let Some(reporter) = &self.reporter {
                    reporter.report(&err);
                }
                FetchState::failed(&err)
            }
        };
        self.state.send_replace(next.clone());
        next
    }

    /// Re-runs the fetch to pick up changes made elsewhere.
    pub async fn hydrate(&self) -> FetchState<Record> {
        self.fetch().await
    }
}

fn initial_state(target: &FetchTarget) -> FetchState<Record> {
    if target.is_enabled() {
        FetchState::loading()
    } else {
        FetchState::idle()
    }
}
