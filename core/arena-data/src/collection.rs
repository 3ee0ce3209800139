//! Whole-collection fetch.

use crate::cache::ScopedCache;
use crate::reporter::ErrorReporter;
use crate::status::FetchState;
use arena_store::DataStore;
use arena_types::{Filter, Order, QueryResult, SelectQuery};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Fetches a list of records, optionally ordered, limited and counted.
///
/// With a [`ScopedCache`] attached, `fetch` serves a cached result set and
/// `hydrate` always goes to the store and refreshes the cache.
pub struct CollectionFetch {
    store: Arc<dyn DataStore>,
    query: SelectQuery,
    state: watch::Sender<FetchState<QueryResult>>,
    cache: Option<(Arc<ScopedCache<QueryResult>>, String)>,
    reporter: Option<Arc<ErrorReporter>>,
}

impl CollectionFetch {
    pub fn new(store: Arc<dyn DataStore>, table: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(FetchState::loading());
        Self {
            store,
            query: SelectQuery::new(table),
            state: tx,
            cache: None,
            reporter: None,
        }
    }

    pub fn select(mut self, select: impl Into<String>) -> Self {
        self.query = self.query.select(select);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.query = self.query.filter(filter);
        self
    }

    /// Ascending order by one column.
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.query = self.query.order(Order::asc(field));
        self
    }

    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.query = self.query.order(Order::desc(field));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    pub fn with_count(mut self) -> Self {
        self.query = self.query.with_count();
        self
    }

    pub fn with_cache(mut self, cache: Arc<ScopedCache<QueryResult>>, key: impl Into<String>) -> Self {
        self.cache = Some((cache, key.into()));
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn query(&self) -> &SelectQuery {
        &self.query
    }

    pub fn state(&self) -> FetchState<QueryResult> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<QueryResult>> {
        self.state.subscribe()
    }

    pub async fn fetch(&self) -> FetchState<QueryResult> {
        if let Some((cache, key)) = &self.cache {
            if let Some(hit) = cache.get(key).await {
                debug!("serving {} from cache key {}", self.query.table, key);
                let next = FetchState::loaded(Some(hit));
                self.state.send_replace(next.clone());
                return next;
            }
        }
        self.load().await
    }

    /// Always reads from the store.
    pub async fn hydrate(&self) -> FetchState<QueryResult> {
        self.load().await
    }

    async fn load(&self) -> FetchState<QueryResult> {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error_code = None;
        });
        debug!("fetching collection {}", self.query.table);

        let next = match self.store.select(&self.query).await {
            Ok(result) => {
                if let Some((cache, key)) = &self.cache {
                    cache.insert(key.clone(), result.clone()).await;
                }
                FetchState::loaded(Some(result))
            }
            Err(err) => {
                warn!("failed to fetch {}: {}", self.query.table, err);
                if let Some(reporter) = &self.reporter {
                    reporter.report(&err);
                }
                FetchState::failed(&err)
            }
        };
        self.state.send_replace(next.clone());
        next
    }
}
