//! Backing-store layer for the Arena data hooks.
//!
//! The hooks never talk HTTP directly. They hold an `Arc<dyn DataStore>`
//! (plus, where needed, a [`FunctionClient`] or [`FileStorage`]) and this
//! crate provides two implementations of each:
//!
//! - [`MemoryStore`]: in-process tables, used by tests and offline tooling
//! - [`RestStore`]: the hosted PostgREST/Supabase surface over `reqwest`
//!
//! # Error codes
//!
//! Failures keep the backend's `code` / `message` / `hint` triple. Unique
//! constraint violations (`23505`) get their own [`StoreError`] variant so
//! forms can say "that name is taken" instead of a generic failure.

mod error;
mod memory;
pub mod rest;
mod store;
mod upload;

pub use error::{StoreError, StoreResult, UNIQUE_VIOLATION_CODE, UploadError};
pub use memory::{FunctionHandler, MemoryStore};
pub use rest::{RestStore, RestStoreConfig};
pub use store::{DataStore, FileStorage, FunctionClient, ProgressFn};
pub use upload::{UploadPolicy, UploadRequest};
