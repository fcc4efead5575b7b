//! Request/response interceptor registry.
//!
//! Interceptors are stored in an arena keyed by [`InterceptorId`], so
//! detaching is a keyed removal. Attachment order is tracked separately and
//! is the order in which a chain runs.
//!
//! A chain threads a `Result` through every attached [`InterceptorPair`]:
//! the fulfilled handler maps `Ok` values (and may fail), the rejected
//! handler maps errors.
//!
//! ```ignore
//! let id = kit.use_request_interceptors(
//!     Some(Arc::new(|mut request: TransportRequest| {
//!         request.headers.insert("x-trace", "1".parse()?);
//!         Ok(request)
//!     })),
//!     None,
//! )?;
//!
//! kit.destroy_request_interceptors(id);
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::error::{KitError, Result};
use crate::logging::targets;

new_key_type! {
    /// Opaque handle to an attached interceptor.
    ///
    /// Returned on attach and consumed on detach. Stale handles (already
    /// detached, or from another instance) are ignored.
    pub struct InterceptorId;
}

/// Handler for a value that passed the chain so far.
pub type FulfilledHandler<T> = Arc<dyn Fn(T) -> Result<T> + Send + Sync>;

/// Handler for an error raised earlier in the chain.
pub type RejectedHandler = Arc<dyn Fn(KitError) -> KitError + Send + Sync>;

/// A fulfilled/rejected handler pair attached as one interceptor.
pub struct InterceptorPair<T> {
    /// Invoked when the chain state is `Ok`.
    pub on_fulfilled: Option<FulfilledHandler<T>>,
    /// Invoked when the chain state is `Err`.
    pub on_rejected: Option<RejectedHandler>,
}

impl<T> InterceptorPair<T> {
    /// Create a pair from optional handlers.
    pub fn new(on_fulfilled: Option<FulfilledHandler<T>>, on_rejected: Option<RejectedHandler>) -> Self {
        Self {
            on_fulfilled,
            on_rejected,
        }
    }

    /// Run this pair against the current chain state.
    pub fn apply(&self, state: Result<T>) -> Result<T> {
        match state {
            Ok(value) => match &self.on_fulfilled {
                Some(handler) => handler(value),
                None => Ok(value),
            },
            Err(error) => match &self.on_rejected {
                Some(handler) => Err(handler(error)),
                None => Err(error),
            },
        }
    }
}

impl<T> Clone for InterceptorPair<T> {
    fn clone(&self) -> Self {
        Self {
            on_fulfilled: self.on_fulfilled.clone(),
            on_rejected: self.on_rejected.clone(),
        }
    }
}

struct Registry<T> {
    entries: SlotMap<InterceptorId, InterceptorPair<T>>,
    order: Vec<InterceptorId>,
}

/// Arena of interceptor pairs for one side of a transport instance.
pub struct InterceptorManager<T> {
    inner: Mutex<Registry<T>>,
}

impl<T> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InterceptorManager<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Registry {
                entries: SlotMap::with_key(),
                order: Vec::new(),
            }),
        }
    }

    /// Attach a pair and return its id.
    pub fn attach(&self, pair: InterceptorPair<T>) -> InterceptorId {
        let mut inner = self.inner.lock();
        let id = inner.entries.insert(pair);
        inner.order.push(id);
        tracing::trace!(target: targets::INTERCEPTOR, ?id, count = inner.order.len(), "interceptor attached");
        id
    }

    /// Detach by id.
    ///
    /// Returns `true` if the interceptor was found and removed, `false` otherwise.
    pub fn eject(&self, id: InterceptorId) -> bool {
        let mut inner = self.inner.lock();
        if inner.entries.remove(id).is_none() {
            tracing::debug!(target: targets::INTERCEPTOR, ?id, "eject of unknown interceptor ignored");
            return false;
        }
        inner.order.retain(|existing| *existing != id);
        true
    }

    /// Detach every interceptor.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Whether `id` is currently attached.
    pub fn contains(&self, id: InterceptorId) -> bool {
        self.inner.lock().entries.contains_key(id)
    }

    /// Number of attached interceptors.
    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    /// Whether no interceptor is attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone the attached pairs in attachment order.
    ///
    /// The lock is released before any handler runs, so handlers may attach
    /// or detach interceptors themselves.
    pub fn snapshot(&self) -> Vec<InterceptorPair<T>> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(*id).cloned())
            .collect()
    }

    /// Run `state` through every attached pair in attachment order.
    pub fn run(&self, state: Result<T>) -> Result<T> {
        self.snapshot()
            .into_iter()
            .fold(state, |state, pair| pair.apply(state))
    }
}

impl<T> std::fmt::Debug for InterceptorManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorManager")
            .field("count", &self.len())
            .finish()
    }
}
