//! Data-access hooks for the Arena site.
//!
//! Every form and list in the UI follows the same "load, edit, save, show
//! status" loop. This crate implements that loop once:
//!
//! - [`Mutation`]: insert, update or delete one record, observable
//!   `Idle -> Saving -> {Success, Errored}` status
//! - [`ItemFetch`]: load one record by id, or nothing for a disabled target
//! - [`CollectionFetch`]: load a list, optionally ordered/limited/counted
//! - [`Search`]: debounced case-insensitive search over named columns
//! - [`FileUpload`]: validated upload with progress
//!
//! Hooks publish their state on `tokio::sync::watch` channels, so a UI layer
//! can either read snapshots or await changes. Errors travel one way only:
//! as `Result` values (mutations, uploads) or as `error_code` (fetches).
//!
//! # Example
//!
//! ```no_run
//! use arena_data::{DataClient, DataConfig};
//! use arena_store::MemoryStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let client = DataClient::from_backend(Arc::new(MemoryStore::new()), DataConfig::default());
//! let save = client.mutation("assets");
//! let fields = json!({"title": "X"}).as_object().cloned();
//! let created = save.save(fields, None).await;
//! # }
//! ```

mod cache;
mod client;
mod collection;
mod config;
mod item;
mod mutation;
pub mod reporter;
mod search;
mod searching;
mod status;
mod timer;
mod upload;

pub use cache::ScopedCache;
pub use client::DataClient;
pub use collection::CollectionFetch;
pub use config::DataConfig;
pub use item::ItemFetch;
pub use mutation::{Mutation, MutationError, MutationMode, MutationResult};
pub use reporter::{ErrorReporter, ReportSink, TracingSink};
pub use search::{DEFAULT_DEBOUNCE, Search};
pub use searching::SearchingFlag;
pub use status::{FetchState, SaveStatus};
pub use timer::DismissTimer;
pub use upload::{FileUpload, UploadState};
