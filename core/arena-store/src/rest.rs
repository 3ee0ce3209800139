//! PostgREST / Supabase HTTP store.
//!
//! Talks to the hosted backend's REST surface:
//! - `/rest/v1/{table}` for rows
//! - `/functions/v1/{name}` for callable functions
//! - `/storage/v1/object/{bucket}/{path}` for uploads

use crate::error::{StoreError, StoreResult, UploadError};
use crate::store::{DataStore, FileStorage, FunctionClient, ProgressFn};
use crate::upload::{UploadRequest, percent};
use arena_types::{Fields, Filter, QueryResult, Record, SelectQuery};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const UPLOAD_CHUNK: usize = 64 * 1024;

/// REST store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestStoreConfig {
    /// Project base URL (e.g. `https://xyz.supabase.co`).
    pub base_url: String,
    /// Public anon key, sent as `apikey` on every request.
    pub api_key: String,
    /// Request timeout (in seconds).
    pub timeout_secs: u64,
}

impl Default for RestStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    hint: Option<String>,
}

/// Error body returned by the storage API.
#[derive(Debug, Deserialize)]
struct StorageApiError {
    message: Option<String>,
    error: Option<String>,
}

/// HTTP implementation of the store traits.
pub struct RestStore {
    config: RestStoreConfig,
    client: Client,
    /// Signed-in user's JWT. Falls back to the anon key when unset.
    access_token: Arc<RwLock<Option<String>>>,
}

impl RestStore {
    /// Creates a new REST store.
    pub fn new(config: RestStoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn config(&self) -> &RestStoreConfig {
        &self.config
    }

    /// Sets (or clears) the session token used for row-level security.
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    /// Public URL of an uploaded object.
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base(),
            encode_path(bucket),
            encode_path(path)
        )
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base(), urlencoding::encode(table))
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.read().await.clone();
        let bearer = token.unwrap_or_else(|| self.config.api_key.clone());
        request.header("apikey", &self.config.api_key).bearer_auth(bearer)
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Response> {
        let response = self.authorize(request).await.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(rest_error(response).await)
        }
    }

    /// PATCH/DELETE with `return=representation`, turning "no rows" into `NotFound`.
    async fn mutate_by_id(&self, request: RequestBuilder, table: &str, id: &str) -> StoreResult<()> {
        let request = request
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation");
        let rows: Vec<Value> = self.send(request).await?.json().await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(format!("{table}/{id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for RestStore {
    fn backend_name(&self) -> &'static str {
        "postgrest"
    }

    async fn select(&self, query: &SelectQuery) -> StoreResult<QueryResult> {
        debug!("GET {} ({} filters)", query.table, query.filters.len());
        let mut request = self
            .client
            .get(self.table_url(&query.table))
            .query(&query_params(query));
        if query.count {
            request = request.header("Prefer", "count=exact");
        }

        let response = self.send(request).await?;
        let count = if query.count {
            response
                .headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_content_range)
        } else {
            None
        };
        let rows: Vec<Value> = response.json().await?;
        let records = rows
            .into_iter()
            .map(Record::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryResult::new(records, count))
    }

    async fn insert(&self, table: &str, fields: Fields) -> StoreResult<Record> {
        debug!("POST {}", table);
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&fields);
        let rows: Vec<Value> = self.send(request).await?.json().await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("{table}: insert returned no row")))?;
        Ok(Record::from_value(row)?)
    }

    async fn update(&self, table: &str, id: &str, fields: Fields) -> StoreResult<()> {
        debug!("PATCH {}/{}", table, id);
        let request = self.client.patch(self.table_url(table)).json(&fields);
        self.mutate_by_id(request, table, id).await
    }

    async fn delete(&self, table: &str, id: &str) -> StoreResult<()> {
        debug!("DELETE {}/{}", table, id);
        let request = self.client.delete(self.table_url(table));
        self.mutate_by_id(request, table, id).await
    }
}

#[async_trait]
impl FunctionClient for RestStore {
    async fn call_function(&self, name: &str, payload: Value) -> StoreResult<Value> {
        debug!("calling function {}", name);
        let url = format!("{}/functions/v1/{}", self.base(), urlencoding::encode(name));
        let response = self
            .authorize(self.client.post(url).json(&payload))
            .await
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Function {
                name: name.to_string(),
                message: format!("{status}: {body}"),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl FileStorage for RestStore {
    async fn upload(&self, request: UploadRequest, progress: Option<ProgressFn>) -> StoreResult<String> {
        let path = request.path();
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base(),
            encode_path(&request.bucket),
            encode_path(&path)
        );
        debug!("uploading {} bytes to {}/{}", request.bytes.len(), request.bucket, path);

        let total = request.bytes.len();
        let chunks: Vec<Vec<u8>> = request.bytes.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect();
        let chunk_progress = progress.clone();
        let mut sent = 0usize;
        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len();
            if let Some(progress) = &chunk_progress {
                progress(percent(sent, total));
            }
            Ok::<_, std::io::Error>(chunk)
        }));

        let http = self
            .client
            .post(url)
            .header("Content-Type", request.content_type.as_str())
            .header("Content-Length", total)
            .header("x-upsert", "true")
            .body(reqwest::Body::wrap_stream(stream));
        let response = self.authorize(http).await.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StorageApiError>(&body)
                .ok()
                .and_then(|e| e.message.or(e.error))
                .unwrap_or(body);
            warn!("upload to {} failed: {} {}", request.bucket, status, message);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    UploadError::Security(message).into()
                }
                _ => StoreError::Database {
                    code: status.as_u16().to_string(),
                    message,
                    hint: None,
                },
            });
        }

        if let Some(progress) = &progress {
            progress(100.0);
        }
        Ok(self.public_url(&request.bucket, &path))
    }
}

/// Translates a select into PostgREST query-string pairs.
pub fn query_params(query: &SelectQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), query.select.replace(' ', ""))];
    for filter in &query.filters {
        let value = match filter {
            Filter::Eq { value, .. } => format!("eq.{}", render_value(value)),
            Filter::ILike { term, .. } => format!("ilike.*{}*", escape_like(term)),
        };
        params.push((filter.field().to_string(), value));
    }
    if let Some(order) = &query.order {
        let dir = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{dir}", order.field)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Total from a `Content-Range` header (`0-9/42`, `*/0`).
pub fn parse_content_range(header: &str) -> Option<usize> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Backslash-escapes LIKE metacharacters so the term matches literally.
/// PostgREST maps `*` to `%`, so it is escaped too.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_' | '*') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

async fn rest_error(response: Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<PostgrestError>(&body) {
        Ok(PostgrestError {
            code: Some(code),
            message,
            hint,
        }) => StoreError::from_parts(code, message.unwrap_or_default(), hint),
        _ => StoreError::Database {
            code: status.as_u16().to_string(),
            message: body,
            hint: None,
        },
    }
}
