//! The [`AxiosKit`] facade.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::abort::AbortController;
use crate::config::{BaseConfig, KitConfig};
use crate::descriptor::{RequestDescriptor, StreamingDescriptor, StreamingMode};
use crate::error::{KitError, Result};
use crate::http::{
    HttpInstance, RequestBody, ResponseData, ResponseType, Transport, TransportRequest,
    TransportResponse,
};
use crate::interceptor::{FulfilledHandler, InterceptorId, InterceptorPair, RejectedHandler};
use crate::loading::LoadingCounter;
use crate::logging::{log_request, targets};
use crate::params::{self, QuerySerializer};
use crate::status::{self, StatusContext, StatusInterceptor};
use crate::streaming::{self, StreamingOutput};

/// Lifecycle state of an [`AxiosKit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KitState {
    /// `create()` has not been called yet.
    Uninitialized,
    /// A transport is bound; requests may be issued.
    Active,
    /// `destroy()` released the transport.
    Destroyed,
}

struct ActiveInstance {
    instance: Arc<HttpInstance>,
    serializer: Option<Arc<dyn QuerySerializer>>,
    request_ids: Vec<InterceptorId>,
    response_ids: Vec<InterceptorId>,
}

impl ActiveInstance {
    fn detach_all(&mut self) {
        for id in self.request_ids.drain(..) {
            self.instance.request_interceptors().eject(id);
        }
        for id in self.response_ids.drain(..) {
            self.instance.response_interceptors().eject(id);
        }
    }
}

/// What a request captures when it is issued.
struct Bound {
    instance: Arc<HttpInstance>,
    serializer: Option<Arc<dyn QuerySerializer>>,
    status_interceptor: Option<StatusInterceptor>,
}

enum Slot {
    Uninitialized,
    Active(ActiveInstance),
    Destroyed,
}

/// Request lifecycle manager.
///
/// Wraps a [`Transport`] with interceptor chains, a global status
/// interceptor, loading tracking and upload/download streaming. The facade
/// is `Send + Sync`; share it behind an `Arc` and issue requests
/// concurrently.
///
/// ```ignore
/// let kit = AxiosKit::new(KitConfig::new().empty_params_filtering(true));
/// kit.create(Arc::new(ReqwestTransport::new()?), BaseConfig::new("https://api.example.com"), None)
///     .use_loading(|| spinner.show(), || spinner.hide())
///     .use_status_interceptors(|ctx: StatusContext| {
///         let body = ctx.response.data.clone().into_value();
///         if body["code"] == 0 {
///             ctx.resolver.resolve(body["data"].clone())
///         } else {
///             ctx.resolver.reject(body)
///         }
///     });
///
/// let user: User = kit.request(RequestDescriptor::get("/users/1")).await?;
/// kit.destroy();
/// ```
pub struct AxiosKit {
    config: KitConfig,
    slot: Mutex<Slot>,
    status_interceptor: Mutex<Option<StatusInterceptor>>,
    loading: Arc<LoadingCounter>,
}

impl AxiosKit {
    /// Create an uninitialized facade.
    pub fn new(config: KitConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(Slot::Uninitialized),
            status_interceptor: Mutex::new(None),
            loading: Arc::new(LoadingCounter::new()),
        }
    }

    /// The facade's configuration.
    pub fn config(&self) -> &KitConfig {
        &self.config
    }

    /// The loading counter shared by every request of this facade.
    pub fn loading(&self) -> &Arc<LoadingCounter> {
        &self.loading
    }

    /// Current lifecycle state.
    pub fn state(&self) -> KitState {
        match &*self.slot.lock() {
            Slot::Uninitialized => KitState::Uninitialized,
            Slot::Active(_) => KitState::Active,
            Slot::Destroyed => KitState::Destroyed,
        }
    }

    /// Bind a transport.
    ///
    /// On an active facade this reinitializes: every interceptor attached
    /// through this facade is detached before the new transport is bound.
    /// The status interceptor and loading callbacks are kept.
    pub fn create(
        &self,
        transport: Arc<dyn Transport>,
        base_config: BaseConfig,
        serializer: Option<Arc<dyn QuerySerializer>>,
    ) -> &Self {
        let mut slot = self.slot.lock();
        if let Slot::Active(active) = &mut *slot {
            tracing::info!(
                target: targets::KIT,
                request_interceptors = active.request_ids.len(),
                response_interceptors = active.response_ids.len(),
                "reinitializing; detaching previous interceptors"
            );
            active.detach_all();
        }
        tracing::debug!(target: targets::KIT, base_url = %base_config.base_url, "transport bound");
        *slot = Slot::Active(ActiveInstance {
            instance: Arc::new(HttpInstance::new(transport, base_config)),
            serializer,
            request_ids: Vec::new(),
            response_ids: Vec::new(),
        });
        self
    }

    /// Release the transport and detach every interceptor.
    ///
    /// Calling this on a facade that is not active does nothing.
    pub fn destroy(&self) {
        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Destroyed) {
            Slot::Active(mut active) => {
                active.detach_all();
                tracing::info!(target: targets::KIT, "destroyed");
            }
            previous => {
                *slot = previous;
                tracing::debug!(target: targets::KIT, "destroy on inactive instance ignored");
            }
        }
    }

    /// Attach a request interceptor.
    pub fn use_request_interceptors(
        &self,
        on_request: Option<FulfilledHandler<TransportRequest>>,
        on_request_error: Option<RejectedHandler>,
    ) -> Result<InterceptorId> {
        let mut slot = self.slot.lock();
        let Slot::Active(active) = &mut *slot else {
            return Err(KitError::NotInitialized);
        };
        let id = active
            .instance
            .request_interceptors()
            .attach(InterceptorPair::new(on_request, on_request_error));
        active.request_ids.push(id);
        Ok(id)
    }

    /// Attach a response interceptor.
    pub fn use_response_interceptors(
        &self,
        on_response: Option<FulfilledHandler<TransportResponse>>,
        on_response_error: Option<RejectedHandler>,
    ) -> Result<InterceptorId> {
        let mut slot = self.slot.lock();
        let Slot::Active(active) = &mut *slot else {
            return Err(KitError::NotInitialized);
        };
        let id = active
            .instance
            .response_interceptors()
            .attach(InterceptorPair::new(on_response, on_response_error));
        active.response_ids.push(id);
        Ok(id)
    }

    /// Detach a request interceptor. Returns `false` for unknown ids.
    pub fn destroy_request_interceptors(&self, id: InterceptorId) -> bool {
        let mut slot = self.slot.lock();
        let Slot::Active(active) = &mut *slot else {
            return false;
        };
        active.request_ids.retain(|existing| *existing != id);
        active.instance.request_interceptors().eject(id)
    }

    /// Detach a response interceptor. Returns `false` for unknown ids.
    pub fn destroy_response_interceptors(&self, id: InterceptorId) -> bool {
        let mut slot = self.slot.lock();
        let Slot::Active(active) = &mut *slot else {
            return false;
        };
        active.response_ids.retain(|existing| *existing != id);
        active.instance.response_interceptors().eject(id)
    }

    /// Ids of the attached request interceptors, in attachment order.
    pub fn request_interceptor_ids(&self) -> Vec<InterceptorId> {
        match &*self.slot.lock() {
            Slot::Active(active) => active.request_ids.clone(),
            _ => Vec::new(),
        }
    }

    /// Ids of the attached response interceptors, in attachment order.
    pub fn response_interceptor_ids(&self) -> Vec<InterceptorId> {
        match &*self.slot.lock() {
            Slot::Active(active) => active.response_ids.clone(),
            _ => Vec::new(),
        }
    }

    /// Install the status interceptor, replacing any previous one.
    ///
    /// Applies to requests issued after this call. Requests already in
    /// flight settle with the interceptor they were issued under.
    pub fn use_status_interceptors<F>(&self, interceptor: F) -> &Self
    where
        F: Fn(StatusContext) + Send + Sync + 'static,
    {
        *self.status_interceptor.lock() = Some(Arc::new(interceptor));
        self
    }

    /// Install loading start/stop callbacks.
    pub fn use_loading<S, E>(&self, on_start: S, on_stop: E) -> &Self
    where
        S: Fn() + Send + Sync + 'static,
        E: Fn() + Send + Sync + 'static,
    {
        self.loading
            .set_callbacks(Some(Arc::new(on_start)), Some(Arc::new(on_stop)));
        self
    }

    /// Issue a request and deserialize its settled value.
    pub async fn request<R: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<R> {
        let bound = self.bind()?;
        let request = self.prepare(&descriptor, bound.serializer.as_deref(), None);
        let value = self.execute(&bound, &descriptor, request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Issue a streaming request.
    pub async fn streaming(&self, descriptor: StreamingDescriptor) -> Result<StreamingOutput> {
        let bound = self.bind()?;
        let StreamingDescriptor {
            request: base,
            mode,
            files,
            file_field,
            response_type,
            response_content_disposition,
            fallback_file_name,
            enable_sequence,
            custom_sequence,
            custom_download_response,
            on_upload_progress,
            on_download_progress,
        } = descriptor;

        let body = match mode {
            StreamingMode::Upload => {
                let sequencer = custom_sequence.as_deref().filter(|_| enable_sequence);
                let form = streaming::build_upload_form(&files, &file_field, base.data.as_ref(), sequencer);
                Some(RequestBody::Multipart(form))
            }
            StreamingMode::Default | StreamingMode::Download => None,
        };
        let mut request = self.prepare(&base, bound.serializer.as_deref(), body);
        request.response_type = match mode {
            StreamingMode::Download => ResponseType::Binary,
            _ => response_type,
        };
        request.on_upload_progress = on_upload_progress;
        request.on_download_progress = on_download_progress;

        if mode != StreamingMode::Download {
            return self
                .execute(&bound, &base, request)
                .await
                .map(StreamingOutput::Value);
        }

        let download = Download {
            header_name: response_content_disposition,
            fallback_file_name,
            transformer: custom_download_response,
        };
        self.execute_download(&bound, &base, request, download).await
    }

    fn bind(&self) -> Result<Bound> {
        let (instance, serializer) = match &*self.slot.lock() {
            Slot::Active(active) => (Arc::clone(&active.instance), active.serializer.clone()),
            _ => return Err(KitError::NotInitialized),
        };
        Ok(Bound {
            instance,
            serializer,
            status_interceptor: self.status_interceptor.lock().clone(),
        })
    }

    /// Place params/data and render the query.
    ///
    /// `body` replaces the payload body; `data` is then already part of it
    /// and only `params` go to the query.
    fn prepare(
        &self,
        descriptor: &RequestDescriptor,
        serializer: Option<&dyn QuerySerializer>,
        body: Option<RequestBody>,
    ) -> TransportRequest {
        let (query, body) = match body {
            Some(body) => (descriptor.params.clone(), body),
            None => {
                let placed = params::place(
                    descriptor.method,
                    descriptor.params.clone(),
                    descriptor.data.clone(),
                    !descriptor.disable_data_auto_differentiate,
                );
                (placed.query, params::body_from_value(placed.body))
            }
        };

        let (url, pairs) = params::apply_query(
            &descriptor.path,
            query,
            self.config.enable_empty_params_filtering,
            serializer,
        );

        let mut request = TransportRequest::new(descriptor.method, url);
        request.headers = descriptor.headers.clone();
        request.query = pairs;
        request.body = body;
        request
    }

    /// Run a request through loading, abort and the transport instance.
    async fn dispatch(
        &self,
        instance: &HttpInstance,
        descriptor: &RequestDescriptor,
        request: TransportRequest,
    ) -> Result<TransportResponse> {
        let guard = (!descriptor.disable_loading).then(|| self.loading.guard());

        let (controller, signal) = AbortController::new();
        if let Some(generator) = &descriptor.abort_generator {
            generator(&controller);
        }

        let outcome = tokio::select! {
            result = instance.dispatch(request) => result,
            () = signal.aborted() => {
                tracing::debug!(target: targets::KIT, path = %descriptor.path, "request aborted");
                Err(KitError::Cancelled)
            }
        };

        drop(guard);
        outcome
    }

    async fn execute(
        &self,
        bound: &Bound,
        descriptor: &RequestDescriptor,
        request: TransportRequest,
    ) -> Result<Value> {
        let started = Instant::now();
        let url = bound.instance.config().resolve_url(&request.url);

        let (status, result) = match self.dispatch(&bound.instance, descriptor, request).await {
            Ok(response) => (
                Some(response.status),
                status::settle(
                    bound.status_interceptor.clone(),
                    response,
                    descriptor.disable_toast,
                )
                .await,
            ),
            Err(error) => (None, Err(error)),
        };

        self.log(descriptor, &url, status, started, &result);
        result
    }

    async fn execute_download(
        &self,
        bound: &Bound,
        descriptor: &RequestDescriptor,
        request: TransportRequest,
        download: Download,
    ) -> Result<StreamingOutput> {
        let started = Instant::now();
        let url = bound.instance.config().resolve_url(&request.url);

        let response = match self.dispatch(&bound.instance, descriptor, request).await {
            Ok(response) => response,
            Err(error) => {
                let result = Err(error);
                self.log(descriptor, &url, None, started, &result);
                return result;
            }
        };

        let status = response.status;
        let interceptor = bound.status_interceptor.clone();
        let result = if response.is_success() {
            download
                .settle(interceptor, response, descriptor.disable_toast)
                .await
        } else {
            let response = streaming::reinterpret_error_body(response);
            status::settle(interceptor, response, descriptor.disable_toast)
                .await
                .map(StreamingOutput::Value)
        };

        self.log(descriptor, &url, Some(status), started, &result);
        result
    }

    fn log<T>(
        &self,
        descriptor: &RequestDescriptor,
        url: &str,
        status: Option<u16>,
        started: Instant,
        result: &Result<T>,
    ) {
        let error = result.as_ref().err().map(ToString::to_string);
        log_request(
            &self.config,
            descriptor.method,
            url,
            status,
            started.elapsed(),
            error.as_deref(),
        );
    }
}

impl std::fmt::Debug for AxiosKit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxiosKit")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("loading", &self.loading)
            .finish_non_exhaustive()
    }
}

/// Download-mode options split out of a [`StreamingDescriptor`].
struct Download {
    header_name: Option<String>,
    fallback_file_name: Option<String>,
    transformer: Option<Arc<dyn streaming::DownloadTransformer>>,
}

impl Download {
    /// Package a 2xx download and let the status interceptor settle it.
    ///
    /// The interceptor sees the packaged value as the response body, keeping
    /// the original status, headers and URL. Without an interceptor the
    /// packaged output is returned as is.
    async fn settle(
        self,
        interceptor: Option<StatusInterceptor>,
        response: TransportResponse,
        disable_toast: bool,
    ) -> Result<StreamingOutput> {
        let Some(interceptor) = interceptor else {
            return self.package(response);
        };

        let mut packaged = TransportResponse::new(response.status, ResponseData::Empty);
        packaged.headers = response.headers.clone();
        packaged.url = response.url.clone();
        packaged.data = ResponseData::Json(self.package(response)?.into_value()?);

        status::settle(Some(interceptor), packaged, disable_toast)
            .await
            .map(StreamingOutput::Value)
    }

    fn package(self, response: TransportResponse) -> Result<StreamingOutput> {
        if let Some(transformer) = self.transformer {
            let headers = response.headers;
            let value = transformer.transform(&headers, streaming::body_bytes(response.data))?;
            return Ok(StreamingOutput::Value(value));
        }
        Ok(StreamingOutput::Download(streaming::package_download(
            response,
            self.header_name.as_deref(),
            self.fallback_file_name.as_deref(),
        )))
    }
}
