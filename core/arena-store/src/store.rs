//! Backing-store abstraction traits.
//!
//! Defines the common interface the data hooks are written against. The
//! relational store, the callable-function endpoint and the file bucket are
//! separate traits because not every backend offers all three.

use crate::error::StoreResult;
use crate::upload::UploadRequest;
use arena_types::{Fields, QueryResult, Record, SelectQuery};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Upload progress callback, called with a percentage in `0.0..=100.0`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Relational record store (tables and views).
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Returns the name of the backend, for logs.
    fn backend_name(&self) -> &'static str;

    /// Runs a read. Results arrive whole; there is no streaming.
    async fn select(&self, query: &SelectQuery) -> StoreResult<QueryResult>;

    /// Inserts a row and returns it with its server-assigned id.
    async fn insert(&self, table: &str, fields: Fields) -> StoreResult<Record>;

    /// Updates a row in place. Nothing is returned.
    async fn update(&self, table: &str, id: &str, fields: Fields) -> StoreResult<()>;

    /// Physically deletes a row.
    async fn delete(&self, table: &str, id: &str) -> StoreResult<()>;

    /// Loads at most one row by id.
    async fn select_one(&self, table: &str, id: &str, select: &str) -> StoreResult<Option<Record>> {
        let query = SelectQuery::by_id(table, id).select(select);
        Ok(self.select(&query).await?.into_first())
    }
}

/// Server-side callable functions (OAuth exchanges, image optimisation, ...).
#[async_trait]
pub trait FunctionClient: Send + Sync {
    async fn call_function(&self, name: &str, payload: Value) -> StoreResult<Value>;
}

/// Public file buckets.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Uploads a file and returns its public URL.
    async fn upload(&self, request: UploadRequest, progress: Option<ProgressFn>) -> StoreResult<String>;
}
