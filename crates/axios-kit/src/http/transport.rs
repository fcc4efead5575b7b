//! The transport seam and the instance that wraps it.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use super::request::TransportRequest;
use super::response::TransportResponse;
use crate::config::BaseConfig;
use crate::error::Result;
use crate::interceptor::InterceptorManager;
use crate::logging::targets;

/// Something that can execute HTTP requests.
///
/// [`ReqwestTransport`](super::ReqwestTransport) is the production
/// implementation; tests substitute a scripted one.
///
/// A transport returns `Ok` for every response it receives, whatever the
/// status code. `Err` is reserved for failures that produced no response.
pub trait Transport: Send + Sync {
    /// Execute one request.
    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<TransportResponse>>;
}

/// A transport bound to base settings and interceptor chains.
///
/// Created by [`AxiosKit::create`](crate::AxiosKit::create); one instance
/// lives for one active period of the facade.
pub struct HttpInstance {
    transport: Arc<dyn Transport>,
    config: BaseConfig,
    request_interceptors: InterceptorManager<TransportRequest>,
    response_interceptors: InterceptorManager<TransportResponse>,
}

impl HttpInstance {
    /// Bind `transport` to `config`.
    pub fn new(transport: Arc<dyn Transport>, config: BaseConfig) -> Self {
        Self {
            transport,
            config,
            request_interceptors: InterceptorManager::new(),
            response_interceptors: InterceptorManager::new(),
        }
    }

    /// The base settings.
    pub fn config(&self) -> &BaseConfig {
        &self.config
    }

    /// The request interceptor chain.
    pub fn request_interceptors(&self) -> &InterceptorManager<TransportRequest> {
        &self.request_interceptors
    }

    /// The response interceptor chain.
    pub fn response_interceptors(&self) -> &InterceptorManager<TransportResponse> {
        &self.response_interceptors
    }

    /// Apply base settings, run both interceptor chains and the transport.
    pub async fn dispatch(&self, mut request: TransportRequest) -> Result<TransportResponse> {
        request.url = self.config.resolve_url(&request.url);
        for (name, value) in &self.config.headers {
            if !request.headers.contains_key(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }
        if request.timeout.is_none() {
            request.timeout = self.config.timeout;
        }

        let request = self.request_interceptors.run(Ok(request))?;
        tracing::debug!(target: targets::TRANSPORT, method = %request.method, url = %request.url, "dispatching request");

        let response = self.transport.send(request).await;
        self.response_interceptors.run(response)
    }
}

impl std::fmt::Debug for HttpInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpInstance")
            .field("config", &self.config)
            .field("request_interceptors", &self.request_interceptors)
            .field("response_interceptors", &self.response_interceptors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KitError;
    use crate::http::{HttpMethod, ResponseData};
    use crate::interceptor::InterceptorPair;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Echo {
        seen: Mutex<Vec<TransportRequest>>,
    }

    impl Transport for Echo {
        fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<TransportResponse>> {
            let url = request.url.clone();
            self.seen.lock().push(request);
            Box::pin(async move {
                let mut response = TransportResponse::new(200, ResponseData::Text(url.clone()));
                response.url = url;
                Ok(response)
            })
        }
    }

    #[tokio::test]
    async fn test_dispatch_applies_base_config() {
        let echo = Arc::new(Echo::default());
        let base = BaseConfig::new("https://api.example.com")
            .header("x-app", "kit")
            .header("accept", "application/json")
            .timeout(Duration::from_secs(5));
        let instance = HttpInstance::new(echo.clone(), base);

        let mut request = TransportRequest::new(HttpMethod::Get, "/users");
        request.headers.insert("accept", "text/plain".parse().unwrap());
        let response = instance.dispatch(request).await.unwrap();

        assert_eq!(response.url, "https://api.example.com/users");
        let seen = echo.seen.lock();
        assert_eq!(seen[0].header("x-app"), Some("kit"));
        assert_eq!(seen[0].header("accept"), Some("text/plain"));
        assert_eq!(seen[0].timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_request_chain_error_skips_transport() {
        let echo = Arc::new(Echo::default());
        let instance = HttpInstance::new(echo.clone(), BaseConfig::default());
        instance.request_interceptors().attach(InterceptorPair::new(
            Some(Arc::new(|_: TransportRequest| Err(KitError::Request("blocked".into())))),
            None,
        ));

        let err = instance
            .dispatch(TransportRequest::new(HttpMethod::Get, "http://localhost/"))
            .await
            .unwrap_err();
        assert!(matches!(err, KitError::Request(ref m) if m == "blocked"));
        assert!(echo.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_response_chain_sees_transport_result() {
        let instance = HttpInstance::new(Arc::new(Echo::default()), BaseConfig::default());
        instance.response_interceptors().attach(InterceptorPair::new(
            Some(Arc::new(|mut response: TransportResponse| {
                response.status = 299;
                Ok(response)
            })),
            None,
        ));

        let response = instance
            .dispatch(TransportRequest::new(HttpMethod::Get, "http://localhost/"))
            .await
            .unwrap();
        assert_eq!(response.status, 299);
    }
}
