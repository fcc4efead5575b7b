//! Shared helpers for facade tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axios_kit::{
    AxiosKit, BaseConfig, KitConfig, KitError, ResponseData, Result, Transport, TransportRequest,
    TransportResponse,
};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;

type Responder = Box<dyn Fn(&TransportRequest) -> Result<TransportResponse> + Send + Sync>;

/// A transport that records every request and answers from a script.
pub struct MockTransport {
    calls: Mutex<Vec<TransportRequest>>,
    responder: Responder,
    delay: Option<Duration>,
}

impl MockTransport {
    /// Answer every request with `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&TransportRequest) -> Result<TransportResponse> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            delay: None,
        }
    }

    /// Answer every request with `status` and a JSON body.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::new(move |_| Ok(json_response(status, body.clone())))
    }

    /// Fail every request with `error`.
    pub fn failing(error: KitError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Hold each response for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<TransportRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_call(&self) -> TransportRequest {
        self.calls
            .lock()
            .last()
            .cloned()
            .expect("transport was never called")
    }
}

impl Transport for MockTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<TransportResponse>> {
        let result = (self.responder)(&request);
        self.calls.lock().push(request);
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }
}

pub fn json_response(status: u16, body: serde_json::Value) -> TransportResponse {
    let mut response = TransportResponse::new(status, ResponseData::Json(body));
    response
        .headers
        .insert("content-type", "application/json".parse().unwrap());
    response
}

/// Loading callbacks that count their invocations.
#[derive(Clone, Default)]
pub struct EdgeCounts {
    pub starts: Arc<AtomicU32>,
    pub stops: Arc<AtomicU32>,
}

impl EdgeCounts {
    pub fn install(kit: &AxiosKit) -> Self {
        let counts = Self::default();
        let (starts, stops) = (counts.starts.clone(), counts.stops.clone());
        kit.use_loading(
            move || {
                starts.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                stops.fetch_add(1, Ordering::SeqCst);
            },
        );
        counts
    }

    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }
}

/// An active facade over `transport` rooted at `https://api.test`.
pub fn active_kit(transport: Arc<MockTransport>) -> AxiosKit {
    active_kit_with(KitConfig::default(), transport)
}

pub fn active_kit_with(config: KitConfig, transport: Arc<MockTransport>) -> AxiosKit {
    let kit = AxiosKit::new(config);
    kit.create(transport, BaseConfig::new("https://api.test"), None);
    kit
}
