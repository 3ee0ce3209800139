use arena_store::UploadPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and limits shared by the hooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Quiet period after the last keystroke before a search runs (ms).
    pub search_debounce_ms: u64,
    /// How long a success message stays up before the form resets (ms).
    pub form_hide_delay_ms: u64,
    /// Client-side upload limits.
    pub upload: UploadPolicy,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            search_debounce_ms: 500,
            form_hide_delay_ms: 3_000,
            upload: UploadPolicy::default(),
        }
    }
}

impl DataConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn form_hide_delay(&self) -> Duration {
        Duration::from_millis(self.form_hide_delay_ms)
    }
}
