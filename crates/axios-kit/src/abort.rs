//! Per-request cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Hook that receives each request's controller before dispatch.
///
/// Keep a clone of the controller to cancel the request later.
pub type AbortGenerator = Arc<dyn Fn(&AbortController) + Send + Sync>;

struct AbortInner {
    cancel_tx: Mutex<Option<oneshot::Sender<()>>>,
    aborted: AtomicBool,
}

/// Cancels one in-flight request.
///
/// Cloning shares the same underlying signal.
#[derive(Clone)]
pub struct AbortController {
    inner: Arc<AbortInner>,
}

/// The receiving side of an [`AbortController`].
pub struct AbortSignal {
    cancel_rx: oneshot::Receiver<()>,
}

impl AbortController {
    /// Create a controller and the signal it drives.
    pub fn new() -> (Self, AbortSignal) {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let controller = Self {
            inner: Arc::new(AbortInner {
                cancel_tx: Mutex::new(Some(cancel_tx)),
                aborted: AtomicBool::new(false),
            }),
        };
        (controller, AbortSignal { cancel_rx })
    }

    /// Cancel the request.
    ///
    /// Returns `true` if the cancellation signal was sent, `false` if the
    /// controller was already aborted or the request has already settled.
    pub fn abort(&self) -> bool {
        match self.inner.cancel_tx.lock().take() {
            Some(tx) => {
                self.inner.aborted.store(true, Ordering::Release);
                tx.send(()).is_ok()
            }
            None => false,
        }
    }

    /// Whether [`abort`](Self::abort) has been called.
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for AbortController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortController")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

impl AbortSignal {
    /// Resolve once the controller aborts.
    ///
    /// Never resolves if every controller clone is dropped without aborting.
    pub async fn aborted(self) {
        if self.cancel_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
