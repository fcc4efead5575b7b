//! In-flight request counter with loading start/stop edges.
//!
//! The counter tracks how many loading-enabled requests are in flight. The
//! `on_start` callback fires when the count leaves zero and `on_stop` fires
//! when it returns to zero, no matter how many requests overlap:
//!
//! ```ignore
//! let counter = Arc::new(LoadingCounter::with_callbacks(
//!     || spinner.show(),
//!     || spinner.hide(),
//! ));
//!
//! let guard = counter.guard(); // on_start
//! let other = counter.guard(); // no edge
//! drop(guard);                 // no edge
//! drop(other);                 // on_stop
//! ```
//!
//! Every request path holds a [`LoadingGuard`], so the decrement happens on
//! success, failure, abort, and when the request future is dropped.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{KitError, Result};
use crate::logging::targets;

/// Callback fired on a loading edge.
pub type LoadingCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    on_start: Option<LoadingCallback>,
    on_stop: Option<LoadingCallback>,
}

/// Counts in-flight requests and reports 0→1 / 1→0 transitions.
///
/// Mutation and the resulting callback run under one edge lock, so start and
/// stop notifications are observed in the same order as the count changes.
/// Callbacks may read [`count`](Self::count) but must not increment or
/// decrement the same counter.
pub struct LoadingCounter {
    count: AtomicUsize,
    edge: Mutex<Callbacks>,
}

impl Default for LoadingCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingCounter {
    /// Create a counter with no callbacks.
    pub fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            edge: Mutex::new(Callbacks::default()),
        }
    }

    /// Create a counter with start/stop callbacks.
    pub fn with_callbacks<S, E>(on_start: S, on_stop: E) -> Self
    where
        S: Fn() + Send + Sync + 'static,
        E: Fn() + Send + Sync + 'static,
    {
        let counter = Self::new();
        counter.set_callbacks(Some(Arc::new(on_start)), Some(Arc::new(on_stop)));
        counter
    }

    /// Replace the start/stop callbacks.
    pub fn set_callbacks(&self, on_start: Option<LoadingCallback>, on_stop: Option<LoadingCallback>) {
        let mut edge = self.edge.lock();
        edge.on_start = on_start;
        edge.on_stop = on_stop;
    }

    /// Current number of tracked requests.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Whether at least one tracked request is in flight.
    pub fn is_loading(&self) -> bool {
        self.count() > 0
    }

    /// Track one more request.
    pub fn increment(&self) {
        let edge = self.edge.lock();
        let previous = self.count.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(target: targets::LOADING, count = previous + 1, "loading increment");
        if previous == 0 {
            Self::fire("on_start", edge.on_start.as_ref());
        }
    }

    /// Release one tracked request.
    ///
    /// Returns [`KitError::Underflow`] without changing the count if no
    /// request is tracked.
    pub fn decrement(&self) -> Result<()> {
        let edge = self.edge.lock();
        let current = self.count.load(Ordering::Acquire);
        if current == 0 {
            tracing::warn!(target: targets::LOADING, "loading decrement without matching increment");
            return Err(KitError::Underflow);
        }
        self.count.store(current - 1, Ordering::Release);
        tracing::trace!(target: targets::LOADING, count = current - 1, "loading decrement");
        if current == 1 {
            Self::fire("on_stop", edge.on_stop.as_ref());
        }
        Ok(())
    }

    /// Increment and return a guard that decrements on drop.
    pub fn guard(self: &Arc<Self>) -> LoadingGuard {
        self.increment();
        LoadingGuard {
            counter: Arc::clone(self),
        }
    }

    fn fire(name: &str, callback: Option<&LoadingCallback>) {
        let Some(callback) = callback else {
            return;
        };
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback())) {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(target: targets::LOADING, callback = name, %message, "loading callback panicked");
        }
    }
}

impl std::fmt::Debug for LoadingCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingCounter")
            .field("count", &self.count())
            .finish()
    }
}

/// Holds one increment of a [`LoadingCounter`] until dropped.
#[must_use = "dropping the guard immediately ends the loading state"]
pub struct LoadingGuard {
    counter: Arc<LoadingCounter>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        // Paired with the increment in `guard()`, so this cannot underflow.
        let _ = self.counter.decrement();
    }
}

impl std::fmt::Debug for LoadingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingGuard").finish_non_exhaustive()
    }
}
