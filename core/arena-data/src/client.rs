//! Wiring for the hooks.
//!
//! A `DataClient` owns the shared pieces (store handles, the searching flag,
//! the reporter, config) and hands out fresh hook instances. Hooks never
//! share state with each other; two `item()` calls for the same id fetch
//! twice.

use crate::cache::ScopedCache;
use crate::collection::CollectionFetch;
use crate::config::DataConfig;
use crate::item::ItemFetch;
use crate::mutation::Mutation;
use crate::reporter::ErrorReporter;
use crate::search::Search;
use crate::searching::SearchingFlag;
use crate::upload::FileUpload;
use arena_store::{DataStore, FileStorage, FunctionClient, StoreError, StoreResult};
use arena_types::{FetchTarget, QueryResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

pub struct DataClient {
    store: Arc<dyn DataStore>,
    functions: Option<Arc<dyn FunctionClient>>,
    files: Option<Arc<dyn FileStorage>>,
    config: DataConfig,
    searching: SearchingFlag,
    reporter: Arc<ErrorReporter>,
    cache: Arc<ScopedCache<QueryResult>>,
}

impl DataClient {
    /// Creates a client over a store that only serves rows.
    pub fn new(store: Arc<dyn DataStore>, config: DataConfig) -> Self {
        Self {
            store,
            functions: None,
            files: None,
            config,
            searching: SearchingFlag::new(),
            reporter: Arc::new(ErrorReporter::default()),
            cache: Arc::new(ScopedCache::new()),
        }
    }

    /// Creates a client over a backend that serves rows, functions and files.
    pub fn from_backend<B>(backend: Arc<B>, config: DataConfig) -> Self
    where
        B: DataStore + FunctionClient + FileStorage + 'static,
    {
        let store: Arc<dyn DataStore> = backend.clone();
        let functions: Arc<dyn FunctionClient> = backend.clone();
        let files: Arc<dyn FileStorage> = backend;
        Self::new(store, config)
            .with_functions(functions)
            .with_files(files)
    }

    pub fn with_functions(mut self, functions: Arc<dyn FunctionClient>) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn with_files(mut self, files: Arc<dyn FileStorage>) -> Self {
        self.files = Some(files);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    pub fn searching(&self) -> &SearchingFlag {
        &self.searching
    }

    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    /// Result sets shared by collections fetched with [`Self::cached_collection`].
    pub fn cache(&self) -> &Arc<ScopedCache<QueryResult>> {
        &self.cache
    }

    /// Insert/update hook for `table`.
    pub fn mutation(&self, table: &str) -> Mutation {
        Mutation::new(self.store.clone(), table).with_reporter(self.reporter.clone())
    }

    /// Delete hook bound to one record.
    pub fn deleter(&self, table: &str, id: &str) -> Mutation {
        self.mutation(table).bound_to(id).deleting()
    }

    pub fn item(&self, table: &str, target: impl Into<FetchTarget>) -> ItemFetch {
        ItemFetch::new(self.store.clone(), table, target).with_reporter(self.reporter.clone())
    }

    pub fn collection(&self, table: &str) -> CollectionFetch {
        CollectionFetch::new(self.store.clone(), table).with_reporter(self.reporter.clone())
    }

    /// Collection fetch that reuses the client's result cache under `key`.
    pub fn cached_collection(&self, table: &str, key: &str) -> CollectionFetch {
        self.collection(table).with_cache(self.cache.clone(), key)
    }

    pub fn search(&self, table: &str, fields: &[&str]) -> Search {
        Search::new(
            self.store.clone(),
            table,
            fields.iter().copied(),
            self.searching.clone(),
        )
        .with_debounce(self.config.search_debounce())
        .with_reporter(self.reporter.clone())
    }

    /// Upload hook, when the backend has file storage.
    pub fn uploader(&self) -> Option<FileUpload> {
        self.files.as_ref().map(|files| {
            FileUpload::new(files.clone(), self.config.upload.clone())
                .with_reporter(self.reporter.clone())
        })
    }

    pub async fn call_function(&self, name: &str, payload: Value) -> StoreResult<Value> {
        let functions = self.functions.as_ref().ok_or_else(|| StoreError::Function {
            name: name.to_string(),
            message: "no function backend configured".to_string(),
        })?;
        let result = functions.call_function(name, payload).await;
        if let Err(err) = &result {
            warn!("function {} failed: {}", name, err);
            self.reporter.report(err);
        }
        result
    }
}
