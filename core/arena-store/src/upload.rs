//! Upload targets and client-side validation.

use crate::error::UploadError;
use serde::{Deserialize, Serialize};

/// A file headed for `bucket/directory/file_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub bucket: String,
    pub directory: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadRequest {
    pub fn new(
        bucket: impl Into<String>,
        directory: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            directory: directory.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Object path inside the bucket.
    pub fn path(&self) -> String {
        let dir = self.directory.trim_matches('/');
        if dir.is_empty() {
            self.file_name.clone()
        } else {
            format!("{dir}/{}", self.file_name)
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Limits applied before any bytes leave the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Maximum file size in bytes.
    pub max_bytes: u64,
    /// Accepted MIME types. `type/*` entries accept any subtype.
    pub allowed_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 50 * 1024 * 1024, // 50 MB
            allowed_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
        }
    }
}

impl UploadPolicy {
    /// Accepts anything up to `max_bytes`.
    pub fn any_type(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            allowed_types: vec!["*/*".to_string()],
        }
    }

    pub fn validate(&self, request: &UploadRequest) -> Result<(), UploadError> {
        for part in [request.bucket.as_str(), request.directory.as_str(), request.file_name.as_str()] {
            if part.split('/').any(|segment| segment == "..") || part.contains('\\') {
                return Err(UploadError::Security(format!("illegal path `{part}`")));
            }
        }
        if request.file_name.trim().is_empty() {
            return Err(UploadError::Security("empty file name".to_string()));
        }
        if request.size() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: request.size(),
                max: self.max_bytes,
            });
        }
        if !self.allows_type(&request.content_type) {
            return Err(UploadError::DisallowedType(request.content_type.clone()));
        }
        Ok(())
    }

    pub fn allows_type(&self, content_type: &str) -> bool {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let major = mime.split('/').next().unwrap_or_default();
        self.allowed_types.iter().any(|allowed| {
            let allowed = allowed.to_ascii_lowercase();
            allowed == "*/*"
                || allowed == mime
                || allowed
                    .strip_suffix("/*")
                    .is_some_and(|prefix| prefix == major)
        })
    }
}

/// Percentage of `sent` out of `total`; empty bodies count as done.
pub(crate) fn percent(sent: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        (sent as f64 / total as f64 * 100.0).min(100.0)
    }
}
