//! Central error reporting.
//!
//! Every hook forwards store failures here. Messages matching the denylist
//! are dropped; the rest go to a [`ReportSink`].

use std::sync::Arc;
use tracing::{debug, error};

/// Error strings produced by browsers, extensions and flaky networks that
/// are not actionable and only add noise to crash reports.
pub const BENIGN_ERRORS: &[&str] = &[
    "ResizeObserver loop limit exceeded",
    "ResizeObserver loop completed with undelivered notifications",
    "Failed to fetch",
    "NetworkError when attempting to fetch resource",
    "Load failed",
    "The operation was aborted",
    "Non-Error promise rejection captured",
    "cancelled",
];

/// Destination for reports that survive filtering.
pub trait ReportSink: Send + Sync {
    fn capture(&self, message: &str);
}

/// Writes reports to the `tracing` error stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn capture(&self, message: &str) {
        error!(target: "arena::report", "{}", message);
    }
}

pub struct ErrorReporter {
    sink: Arc<dyn ReportSink>,
    denylist: Vec<String>,
}

impl ErrorReporter {
    /// Creates a reporter with the built-in denylist.
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self {
            sink,
            denylist: BENIGN_ERRORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replaces the denylist.
    pub fn with_denylist<I, S>(mut self, denylist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denylist = denylist.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_benign(&self, message: &str) -> bool {
        self.denylist.iter().any(|needle| message.contains(needle.as_str()))
    }

    /// Reports an error. Returns whether it was forwarded.
    pub fn report(&self, err: &dyn std::error::Error) -> bool {
        self.report_message(&err.to_string())
    }

    pub fn report_message(&self, message: &str) -> bool {
        if self.is_benign(message) {
            debug!("dropping benign error report: {}", message);
            return false;
        }
        self.sink.capture(message);
        true
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}
