use std::sync::{Arc, Weak};
use std::time::Duration;

use clauseguard_core::toast::{Toast, ToastSpec};
use clauseguard_core::types::ToastId;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

struct Inner {
    toasts: watch::Sender<Vec<Toast>>,
}

impl Inner {
    fn remove(&self, id: ToastId) -> bool {
        self.toasts.send_if_modified(|list| {
            let before = list.len();
            list.retain(|t| t.id != id);
            list.len() != before
        })
    }
}

/// In-memory queue of user-facing notifications, kept in push order.
///
/// Expiry timers only hold a weak reference and stop when the bus is dropped.
pub struct ToastBus {
    inner: Arc<Inner>,
    shutdown: CancellationToken,
}

impl Default for ToastBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                toasts: watch::Sender::new(Vec::new()),
            }),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Toast>> {
        self.inner.toasts.subscribe()
    }

    pub fn snapshot(&self) -> Vec<Toast> {
        self.inner.toasts.borrow().clone()
    }

    pub fn push(&self, spec: ToastSpec) -> ToastId {
        let id = ToastId::new();
        let toast = Toast::from_spec(id, spec, chrono::Utc::now().timestamp_millis());
        let expiry = toast.auto_dismiss_after();
        log::debug!("toast {:?}: {}", toast.variant, toast.title);

        self.inner.toasts.send_modify(|list| list.push(toast));
        if let Some(after) = expiry {
            self.schedule_removal(id, after);
        }
        id
    }

    fn schedule_removal(&self, id: ToastId, after: Duration) {
        let Ok(handle) = Handle::try_current() else {
            log::debug!("no async runtime; toast stays until dismissed");
            return;
        };
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let shutdown = self.shutdown.clone();
        handle.spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    if let Some(inner) = inner.upgrade() {
                        inner.remove(id);
                    }
                }
            }
        });
    }

    /// Removes one toast. Unknown ids are ignored; returns whether anything changed.
    pub fn dismiss(&self, id: ToastId) -> bool {
        self.inner.remove(id)
    }

    pub fn dismiss_all(&self) {
        self.inner.toasts.send_if_modified(|list| {
            let changed = !list.is_empty();
            list.clear();
            changed
        });
    }

    pub fn success(&self, title: &str, description: impl Into<String>) -> ToastId {
        self.push(ToastSpec::success(title, description))
    }

    pub fn error(&self, title: &str, description: impl Into<String>) -> ToastId {
        self.push(ToastSpec::error(title, description))
    }

    pub fn warning(&self, title: &str, description: impl Into<String>) -> ToastId {
        self.push(ToastSpec::warning(title, description))
    }

    pub fn info(&self, title: &str, description: impl Into<String>) -> ToastId {
        self.push(ToastSpec::info(title, description))
    }

    pub fn loading(&self, title: &str, description: impl Into<String>) -> ToastId {
        self.push(ToastSpec::loading(title, description))
    }
}

impl Drop for ToastBus {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
