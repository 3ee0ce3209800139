//! Debounced substring search.
//!
//! Each call to [`Search::set_term`] restarts a trailing-edge timer. When
//! the timer survives the quiet period the query is issued as its own task,
//! so a later keystroke cancels only a pending timer, never a query already
//! on the wire. Every keystroke also bumps a generation counter; a response
//! whose generation is no longer current is dropped, so results always
//! belong to the latest term.

use crate::reporter::ErrorReporter;
use crate::searching::SearchingFlag;
use crate::status::FetchState;
use arena_store::DataStore;
use arena_types::{Filter, Record, SelectQuery};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default quiet period after the last keystroke.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Case-insensitive search over a fixed set of columns.
///
/// Every listed column must contain the term (predicates are ANDed).
pub struct Search {
    store: Arc<dyn DataStore>,
    table: String,
    select: String,
    fields: Vec<String>,
    limit: Option<usize>,
    debounce: Duration,
    state: Arc<watch::Sender<FetchState<Vec<Record>>>>,
    searching: SearchingFlag,
    reporter: Option<Arc<ErrorReporter>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    generation: Arc<AtomicU64>,
}

impl Search {
    pub fn new<I, S>(store: Arc<dyn DataStore>, table: impl Into<String>, fields: I, searching: SearchingFlag) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (tx, _) = watch::channel(FetchState::idle());
        Self {
            store,
            table: table.into(),
            select: "*".to_string(),
            fields: fields.into_iter().map(Into::into).collect(),
            limit: None,
            debounce: DEFAULT_DEBOUNCE,
            state: Arc::new(tx),
            searching,
            reporter: None,
            timer: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_select(mut self, select: impl Into<String>) -> Self {
        self.select = select.into();
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn state(&self) -> FetchState<Vec<Record>> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<Vec<Record>>> {
        self.state.subscribe()
    }

    /// The query a term would run.
    pub fn query_for(&self, term: &str) -> SelectQuery {
        let mut query = SelectQuery::new(self.table.clone()).select(self.select.clone());
        for field in &self.fields {
            query = query.filter(Filter::ilike(field.clone(), term));
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        query
    }

    /// Records a keystroke. Must be called inside a Tokio runtime.
    ///
    /// A blank term cancels any pending timer and clears results without
    /// querying.
    pub fn set_term(&self, term: impl Into<String>) {
        let term = term.into();
        let mut timer = self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pending) = timer.take() {
            pending.abort();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let term = term.trim();
        if term.is_empty() {
            self.state.send_replace(FetchState::idle());
            return;
        }

        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error_code = None;
        });
        let job = self.job(term, generation);
        let delay = self.debounce;
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(job.run());
        }));
    }

    /// Runs a search immediately, bypassing the debounce.
    pub async fn search_now(&self, term: &str) -> FetchState<Vec<Record>> {
        self.cancel();
        let term = term.trim();
        if term.is_empty() {
            self.state.send_replace(FetchState::idle());
            return FetchState::idle();
        }
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error_code = None;
        });
        let generation = self.generation.load(Ordering::SeqCst);
        self.job(term, generation).run().await;
        self.state()
    }

    /// Drops a pending keystroke timer and ignores any query still in
    /// flight. Results already shown are kept.
    pub fn cancel(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pending) = timer.take() {
            pending.abort();
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_if_modified(|state| std::mem::replace(&mut state.is_loading, false));
    }

    fn job(&self, term: &str, generation: u64) -> QueryJob {
        QueryJob {
            store: self.store.clone(),
            query: self.query_for(term),
            state: self.state.clone(),
            searching: self.searching.clone(),
            reporter: self.reporter.clone(),
            generation,
            current: self.generation.clone(),
        }
    }
}

impl Drop for Search {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct QueryJob {
    store: Arc<dyn DataStore>,
    query: SelectQuery,
    state: Arc<watch::Sender<FetchState<Vec<Record>>>>,
    searching: SearchingFlag,
    reporter: Option<Arc<ErrorReporter>>,
    generation: u64,
    current: Arc<AtomicU64>,
}

impl QueryJob {
    async fn run(self) {
        let _searching = self.searching.begin();
        debug!("searching {} ({} fields)", self.query.table, self.query.filters.len());
        let next = match self.store.select(&self.query).await {
            Ok(result) => FetchState::loaded(Some(result.records)),
            Err(err) => {
                warn!("search on {} failed: {}", self.query.table, err);
                if let Some(reporter) = &self.reporter {
                    reporter.report(&err);
                }
                FetchState::failed(&err)
            }
        };
        let generation = self.generation;
        let current = &self.current;
        let applied = self.state.send_if_modified(|state| {
            if current.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = next;
            true
        });
        if !applied {
            debug!("dropping stale search response for {}", self.query.table);
        }
    }
}
