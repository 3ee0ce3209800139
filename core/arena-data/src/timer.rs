use crate::status::SaveStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Resets a mutation's `Success` status to `Idle` after a delay.
///
/// A new status arriving before the delay elapses restarts the wait.
/// Dropping the timer stops it.
pub struct DismissTimer {
    handle: JoinHandle<()>,
}

impl DismissTimer {
    pub(crate) fn spawn(status: Arc<watch::Sender<SaveStatus>>, delay: Duration) -> Self {
        let mut rx = status.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                let success = rx.borrow_and_update().is_success();
                if success {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {
                            status.send_if_modified(|current| {
                                if current.is_success() {
                                    *current = SaveStatus::Idle;
                                    true
                                } else {
                                    false
                                }
                            });
                        }
                        changed = rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                } else if rx.changed().await.is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for DismissTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
