//! Global status interception.
//!
//! A status interceptor sees every HTTP response before the caller does and
//! decides how the request settles. It receives a [`StatusContext`] whose
//! [`Resolver`] must be consumed by exactly one of
//! [`resolve`](Resolver::resolve) or [`reject`](Resolver::reject):
//!
//! ```ignore
//! kit.use_status_interceptors(|ctx: StatusContext| {
//!     let body = ctx.response.data.clone().into_value();
//!     match body["code"].as_i64() {
//!         Some(0) => ctx.resolver.resolve(body["data"].clone()),
//!         _ => {
//!             if !ctx.disable_toast {
//!                 toast::error(body["message"].as_str().unwrap_or("request failed"));
//!             }
//!             ctx.resolver.reject(body)
//!         }
//!     }
//! });
//! ```
//!
//! The resolver may be moved elsewhere and settled later. If it is dropped
//! unsettled the request fails with [`KitError::StatusUnresolved`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{KitError, Result};
use crate::http::TransportResponse;
use crate::logging::targets;

/// The status interceptor callback.
pub type StatusInterceptor = Arc<dyn Fn(StatusContext) + Send + Sync>;

/// Everything a status interceptor needs to settle one request.
pub struct StatusContext {
    /// The response as produced by the transport and response interceptors.
    pub response: TransportResponse,
    /// Whether the originating request asked for failure toasts to be suppressed.
    pub disable_toast: bool,
    /// Settles the request.
    pub resolver: Resolver,
}

impl std::fmt::Debug for StatusContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusContext")
            .field("response", &self.response)
            .field("disable_toast", &self.disable_toast)
            .finish_non_exhaustive()
    }
}

/// One-shot settlement handle for a request.
pub struct Resolver {
    tx: oneshot::Sender<Result<Value>>,
}

impl Resolver {
    fn channel() -> (Self, oneshot::Receiver<Result<Value>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Resolve the request with `value`.
    pub fn resolve(self, value: impl Into<Value>) {
        self.settle(Ok(value.into()));
    }

    /// Reject the request with `reason`.
    pub fn reject(self, reason: impl Into<Value>) {
        self.settle(Err(KitError::StatusRejected(reason.into())));
    }

    /// Reject the request with a specific error.
    pub fn reject_with(self, error: KitError) {
        self.settle(Err(error));
    }

    fn settle(self, outcome: Result<Value>) {
        // The receiver is gone only if the request future was dropped.
        if self.tx.send(outcome).is_err() {
            tracing::debug!(target: targets::STATUS, "request dropped before status settlement");
        }
    }
}

/// Settle a response without a status interceptor.
///
/// 2xx responses resolve with their payload; anything else is an
/// [`KitError::HttpStatus`].
pub fn default_outcome(response: TransportResponse) -> Result<Value> {
    if response.is_success() {
        Ok(response.data.into_value())
    } else {
        Err(KitError::HttpStatus {
            status: response.status,
            message: response.data.summary(),
        })
    }
}

/// Route a response through `interceptor`, or settle it by default.
pub(crate) async fn settle(
    interceptor: Option<StatusInterceptor>,
    response: TransportResponse,
    disable_toast: bool,
) -> Result<Value> {
    let Some(interceptor) = interceptor else {
        return default_outcome(response);
    };

    let (resolver, outcome) = Resolver::channel();
    let context = StatusContext {
        response,
        disable_toast,
        resolver,
    };
    if catch_unwind(AssertUnwindSafe(|| interceptor(context))).is_err() {
        tracing::error!(target: targets::STATUS, "status interceptor panicked");
        return Err(KitError::StatusRejected(Value::String(
            "status interceptor panicked".to_string(),
        )));
    }

    match outcome.await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(target: targets::STATUS, "status interceptor dropped its resolver");
            Err(KitError::StatusUnresolved)
        }
    }
}
