//! File upload with client-side validation and progress.

use crate::mutation::{Mutation, MutationError, MutationResult};
use crate::reporter::ErrorReporter;
use arena_store::{FileStorage, ProgressFn, StoreError, StoreResult, UploadPolicy, UploadRequest};
use arena_types::Fields;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Observable state of a [`FileUpload`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    pub is_uploading: bool,
    /// Percentage complete, `0.0..=100.0`.
    pub percentage: f64,
    pub url: Option<String>,
    pub error: Option<StoreError>,
}

/// Validates and uploads one file at a time to a bucket.
pub struct FileUpload {
    storage: Arc<dyn FileStorage>,
    policy: UploadPolicy,
    state: Arc<watch::Sender<UploadState>>,
    reporter: Option<Arc<ErrorReporter>>,
}

impl FileUpload {
    pub fn new(storage: Arc<dyn FileStorage>, policy: UploadPolicy) -> Self {
        let (tx, _) = watch::channel(UploadState::default());
        Self {
            storage,
            policy,
            state: Arc::new(tx),
            reporter: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    /// Uploads a file and returns its public URL.
    ///
    /// Size, type and path are checked first; a rejected file never reaches
    /// the storage backend.
    pub async fn upload(&self, request: UploadRequest) -> StoreResult<String> {
        if let Err(err) = self.policy.validate(&request) {
            let err = StoreError::from(err);
            debug!("rejected upload {}: {}", request.file_name, err);
            self.state.send_replace(UploadState {
                error: Some(err.clone()),
                ..Default::default()
            });
            return Err(err);
        }

        self.state.send_replace(UploadState {
            is_uploading: true,
            ..Default::default()
        });
        let state = self.state.clone();
        let progress: ProgressFn = Arc::new(move |percentage: f64| {
            state.send_modify(|s| s.percentage = percentage);
        });

        match self.storage.upload(request, Some(progress)).await {
            Ok(url) => {
                self.state.send_replace(UploadState {
                    is_uploading: false,
                    percentage: 100.0,
                    url: Some(url.clone()),
                    error: None,
                });
                Ok(url)
            }
            Err(err) => {
                warn!("upload failed: {}", err);
                if let Some(reporter) = &self.reporter {
                    reporter.report(&err);
                }
                self.state.send_replace(UploadState {
                    error: Some(err.clone()),
                    ..Default::default()
                });
                Err(err)
            }
        }
    }

    /// Uploads a file, then writes its URL into `field` through `mutation`.
    ///
    /// Returns the URL. Nothing is saved if the upload fails.
    pub async fn upload_and_save(
        &self,
        request: UploadRequest,
        mutation: &Mutation,
        field: &str,
        id: Option<&str>,
    ) -> MutationResult<String> {
        let url = self.upload(request).await.map_err(MutationError::Store)?;
        let mut fields = Fields::new();
        fields.insert(field.to_string(), Value::String(url.clone()));
        mutation.save(Some(fields), id).await?;
        Ok(url)
    }

    pub fn clear(&self) {
        self.state.send_replace(UploadState::default());
    }
}
