//! In-process store.
//!
//! Behaves like the hosted backend where the hooks can observe it: ids and
//! audit columns are assigned here, unique columns are enforced with the
//! Postgres error code, and every call is counted so tests can assert that
//! nothing reached the "network".

use crate::error::{StoreError, StoreResult};
use crate::store::{DataStore, FileStorage, FunctionClient, ProgressFn};
use crate::upload::{UploadRequest, percent};
use arena_types::{Fields, QueryResult, Record, SelectQuery};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Handler for a registered callable function.
pub type FunctionHandler = Arc<dyn Fn(Value) -> StoreResult<Value> + Send + Sync>;

const UPLOAD_CHUNK: usize = 64 * 1024;

/// An in-memory implementation of every store trait.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Record>>>,
    unique: HashMap<String, Vec<String>>,
    functions: HashMap<String, FunctionHandler>,
    objects: RwLock<HashMap<String, Vec<u8>>>,
    acting_user: Option<String>,
    latency: Option<Duration>,
    calls: AtomicUsize,
    injected: Mutex<Vec<StoreError>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `field` unique within `table`.
    pub fn with_unique(mut self, table: &str, field: &str) -> Self {
        self.unique
            .entry(table.to_string())
            .or_default()
            .push(field.to_string());
        self
    }

    /// Registers a callable function.
    pub fn with_function<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Value) -> StoreResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(handler));
        self
    }

    /// Seeds a table with existing rows.
    pub fn with_records(mut self, table: &str, records: Vec<Record>) -> Self {
        self.tables
            .get_mut()
            .entry(table.to_string())
            .or_default()
            .extend(records);
        self
    }

    /// User id written into `createdby` / `lastmodifiedby`.
    pub fn acting_as(mut self, user_id: impl Into<String>) -> Self {
        self.acting_user = Some(user_id.into());
        self
    }

    /// Delays every call, so tests can overlap requests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next call fail with `err`. Queued failures are used in order.
    pub fn fail_next(&self, err: StoreError) {
        self.injected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(err);
    }

    /// Number of calls that reached the store, failed or not.
    pub fn call_count(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Snapshot of a table, in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.tables.read().await.get(table).cloned().unwrap_or_default()
    }

    /// Raw bytes of an uploaded object.
    pub async fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(&format!("{bucket}/{path}")).cloned()
    }

    async fn begin(&self, op: &str, target: &str) -> StoreResult<()> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        debug!("memory store {} {}", op, target);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut injected = self
            .injected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if injected.is_empty() {
            Ok(())
        } else {
            Err(injected.remove(0))
        }
    }

    fn check_unique(&self, table: &str, rows: &[Record], id: Option<&str>, fields: &Fields) -> StoreResult<()> {
        let Some(columns) = self.unique.get(table) else {
            return Ok(());
        };
        for column in columns {
            let Some(value) = fields.get(column) else {
                continue;
            };
            let clash = rows
                .iter()
                .filter(|row| Some(row.id.as_str()) != id)
                .any(|row| row.fields.get(column) == Some(value));
            if clash {
                return Err(StoreError::UniqueViolation {
                    message: format!(
                        "duplicate key value violates unique constraint \"{table}_{column}_key\""
                    ),
                    hint: None,
                });
            }
        }
        Ok(())
    }

    fn now() -> Value {
        Value::String(chrono::Utc::now().to_rfc3339())
    }

    fn actor(&self) -> Value {
        self.acting_user
            .clone()
            .map_or(Value::Null, Value::String)
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, query: &SelectQuery) -> StoreResult<QueryResult> {
        self.begin("select", &query.table).await?;
        let tables = self.tables.read().await;
        let mut matched: Vec<Record> = tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        drop(tables);

        if let Some(order) = &query.order {
            matched.sort_by(|a, b| {
                let ord = if order.field == "id" {
                    a.id.cmp(&b.id)
                } else {
                    compare_columns(a.fields.get(&order.field), b.fields.get(&order.field))
                };
                if order.ascending { ord } else { ord.reverse() }
            });
        }

        let count = query.count.then_some(matched.len());
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        let records = matched
            .into_iter()
            .map(|r| project(r, &query.select))
            .collect();
        Ok(QueryResult::new(records, count))
    }

    async fn insert(&self, table: &str, mut fields: Fields) -> StoreResult<Record> {
        self.begin("insert", table).await?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();

        let id = match fields.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            _ => uuid::Uuid::now_v7().to_string(),
        };
        if rows.iter().any(|r| r.id == id) {
            return Err(StoreError::UniqueViolation {
                message: format!("duplicate key value violates unique constraint \"{table}_pkey\""),
                hint: None,
            });
        }
        self.check_unique(table, rows, None, &fields)?;

        fields.insert("createdat".into(), Self::now());
        fields.insert("createdby".into(), self.actor());
        let record = Record::new(id, fields);
        rows.push(record.clone());
        Ok(record)
    }

    async fn update(&self, table: &str, id: &str, fields: Fields) -> StoreResult<()> {
        self.begin("update", table).await?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NotFound(format!("{table}/{id}")))?;
        self.check_unique(table, rows, Some(id), &fields)?;

        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("{table}/{id}")))?;
        for (key, value) in fields {
            if key != "id" {
                row.fields.insert(key, value);
            }
        }
        row.fields.insert("lastmodifiedat".into(), Self::now());
        row.fields.insert("lastmodifiedby".into(), self.actor());
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> StoreResult<()> {
        self.begin("delete", table).await?;
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NotFound(format!("{table}/{id}")))?;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(StoreError::NotFound(format!("{table}/{id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl FunctionClient for MemoryStore {
    async fn call_function(&self, name: &str, payload: Value) -> StoreResult<Value> {
        self.begin("call", name).await?;
        let handler = self.functions.get(name).ok_or_else(|| StoreError::Function {
            name: name.to_string(),
            message: "function not found".to_string(),
        })?;
        handler(payload)
    }
}

#[async_trait]
impl FileStorage for MemoryStore {
    async fn upload(&self, request: UploadRequest, progress: Option<ProgressFn>) -> StoreResult<String> {
        self.begin("upload", &request.bucket).await?;
        let path = request.path();
        let total = request.bytes.len();
        if let Some(progress) = &progress {
            let mut sent = 0;
            for chunk in request.bytes.chunks(UPLOAD_CHUNK) {
                sent += chunk.len();
                progress(percent(sent, total));
            }
            if total == 0 {
                progress(100.0);
            }
        }
        let url = format!("memory://{}/{}", request.bucket, path);
        self.objects
            .write()
            .await
            .insert(format!("{}/{}", request.bucket, path), request.bytes);
        Ok(url)
    }
}

/// Postgres-like ordering: nulls last, numbers numerically, strings bytewise.
fn compare_columns(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// Keeps only the plain columns named in a select list. Embedded resources
/// (`author:authorid(username)`) are server-side joins and are skipped.
fn project(record: Record, select: &str) -> Record {
    let columns: Vec<&str> = select.split(',').map(str::trim).collect();
    if columns.iter().any(|c| *c == "*") {
        return record;
    }
    let Record { id, mut fields } = record;
    fields.retain(|key, _| columns.contains(&key.as_str()));
    Record::new(id, fields)
}
