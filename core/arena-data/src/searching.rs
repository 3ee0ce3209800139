use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Application-wide "a search is running" indicator.
///
/// Cloned into every [`Search`](crate::Search) by the owning client rather
/// than living in a global. Reads `true` while at least one search query is
/// in flight.
#[derive(Clone)]
pub struct SearchingFlag {
    inner: Arc<FlagInner>,
}

struct FlagInner {
    in_flight: Mutex<usize>,
    tx: watch::Sender<bool>,
}

impl SearchingFlag {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(FlagInner {
                in_flight: Mutex::new(0),
                tx,
            }),
        }
    }

    pub fn is_searching(&self) -> bool {
        *self.inner.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.tx.subscribe()
    }

    /// Marks a query as started; the flag drops when the guard does.
    pub(crate) fn begin(&self) -> SearchingGuard {
        let mut in_flight = self.inner.lock();
        *in_flight += 1;
        self.inner.tx.send_replace(true);
        SearchingGuard {
            inner: self.inner.clone(),
        }
    }
}

impl Default for SearchingFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SearchingFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchingFlag")
            .field("searching", &self.is_searching())
            .finish()
    }
}

impl FlagInner {
    fn lock(&self) -> std::sync::MutexGuard<'_, usize> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub(crate) struct SearchingGuard {
    inner: Arc<FlagInner>,
}

impl Drop for SearchingGuard {
    fn drop(&mut self) {
        let mut in_flight = self.inner.lock();
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.inner.tx.send_replace(false);
        }
    }
}
