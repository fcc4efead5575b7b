//! Per-call request descriptions.

use std::sync::Arc;

use serde_json::Value;

use crate::abort::{AbortController, AbortGenerator};
use crate::http::{FilePart, HttpMethod, MultipartForm, ProgressCallback, ResponseType, TransferProgress};
use crate::streaming::{DownloadTransformer, FormSequencer};

/// Everything needed to issue one request through
/// [`AxiosKit::request`](crate::AxiosKit::request).
///
/// ```ignore
/// let users: Vec<User> = kit
///     .request(
///         RequestDescriptor::get("/users")
///             .params(json!({"page": 1, "q": ""}))
///             .disable_loading(true),
///     )
///     .await?;
/// ```
#[derive(Clone)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path, resolved against the base URL.
    pub path: String,
    /// Query parameters.
    pub params: Option<Value>,
    /// Request payload.
    pub data: Option<Value>,
    /// Per-request headers.
    pub headers: http::HeaderMap,
    /// Skip the loading counter for this request.
    pub disable_loading: bool,
    /// Passed to the status interceptor so it can skip failure toasts.
    pub disable_toast: bool,
    /// Use `params` and `data` exactly as given.
    pub disable_data_auto_differentiate: bool,
    /// Receives the request's abort controller before dispatch.
    pub abort_generator: Option<AbortGenerator>,
}

impl RequestDescriptor {
    /// Describe a request.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: None,
            data: None,
            headers: http::HeaderMap::new(),
            disable_loading: false,
            disable_toast: false,
            disable_data_auto_differentiate: false,
            abort_generator: None,
        }
    }

    /// Describe a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Describe a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Describe a PUT request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// Describe a DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Describe a PATCH request.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    /// Set query parameters.
    pub fn params(mut self, params: impl Into<Value>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Set the payload.
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Add a header. Invalid names or values are logged and skipped.
    pub fn header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Self {
        if let (Ok(name), Ok(value)) = (name.try_into(), value.try_into()) {
            self.headers.insert(name, value);
        } else {
            tracing::warn!(target: crate::logging::targets::KIT, "Ignoring invalid request header");
        }
        self
    }

    /// Skip loading tracking.
    pub fn disable_loading(mut self, disable: bool) -> Self {
        self.disable_loading = disable;
        self
    }

    /// Ask the status interceptor not to toast failures.
    pub fn disable_toast(mut self, disable: bool) -> Self {
        self.disable_toast = disable;
        self
    }

    /// Turn off query/body auto-differentiation.
    pub fn disable_data_auto_differentiate(mut self, disable: bool) -> Self {
        self.disable_data_auto_differentiate = disable;
        self
    }

    /// Hook the request's abort controller.
    pub fn abort_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&AbortController) + Send + Sync + 'static,
    {
        self.abort_generator = Some(Arc::new(generator));
        self
    }
}

impl std::fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("headers", &self.headers)
            .field("disable_loading", &self.disable_loading)
            .field("disable_toast", &self.disable_toast)
            .field("disable_data_auto_differentiate", &self.disable_data_auto_differentiate)
            .finish_non_exhaustive()
    }
}

/// Streaming behavior of a [`StreamingDescriptor`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamingMode {
    /// A plain request.
    #[default]
    Default,
    /// Multipart upload of `files`.
    Upload,
    /// Binary download packaged as a [`DownloadEnvelope`](crate::streaming::DownloadEnvelope).
    Download,
}

/// Default multipart field name for uploaded files.
pub const DEFAULT_FILE_FIELD: &str = "file";

/// A request with upload/download semantics for
/// [`AxiosKit::streaming`](crate::AxiosKit::streaming).
#[derive(Clone)]
pub struct StreamingDescriptor {
    /// The underlying request.
    pub request: RequestDescriptor,
    /// What kind of stream this is.
    pub mode: StreamingMode,
    /// Files to upload.
    pub files: Vec<FilePart>,
    /// Field name used for each file when no sequencer is active.
    pub file_field: String,
    /// Response decoding hint. Download mode always decodes as binary.
    pub response_type: ResponseType,
    /// Header to read the download filename from, instead of `Content-Disposition`.
    pub response_content_disposition: Option<String>,
    /// Filename used when the response does not carry one.
    pub fallback_file_name: Option<String>,
    /// Hand file ordering and naming to `custom_sequence`.
    pub enable_sequence: bool,
    /// Builds the upload form when `enable_sequence` is set.
    pub custom_sequence: Option<Arc<dyn FormSequencer>>,
    /// Replaces the download envelope with a custom value.
    pub custom_download_response: Option<Arc<dyn DownloadTransformer>>,
    /// Upload progress.
    pub on_upload_progress: Option<ProgressCallback>,
    /// Download progress.
    pub on_download_progress: Option<ProgressCallback>,
}

impl StreamingDescriptor {
    /// Wrap a request with the given streaming mode.
    pub fn new(request: RequestDescriptor, mode: StreamingMode) -> Self {
        Self {
            request,
            mode,
            files: Vec::new(),
            file_field: DEFAULT_FILE_FIELD.to_string(),
            response_type: ResponseType::default(),
            response_content_disposition: None,
            fallback_file_name: None,
            enable_sequence: false,
            custom_sequence: None,
            custom_download_response: None,
            on_upload_progress: None,
            on_download_progress: None,
        }
    }

    /// Describe a multipart upload to `path`.
    pub fn upload(path: impl Into<String>, files: Vec<FilePart>) -> Self {
        let mut descriptor = Self::new(RequestDescriptor::post(path), StreamingMode::Upload);
        descriptor.files = files;
        descriptor
    }

    /// Describe a binary download from `path`.
    pub fn download(path: impl Into<String>) -> Self {
        Self::new(RequestDescriptor::get(path), StreamingMode::Download)
    }

    /// Change the request.
    pub fn map_request(mut self, f: impl FnOnce(RequestDescriptor) -> RequestDescriptor) -> Self {
        self.request = f(self.request);
        self
    }

    /// Set the file field name.
    pub fn file_field(mut self, name: impl Into<String>) -> Self {
        self.file_field = name.into();
        self
    }

    /// Set the response decoding hint.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Read the download filename from `header` instead of `Content-Disposition`.
    pub fn response_content_disposition(mut self, header: impl Into<String>) -> Self {
        self.response_content_disposition = Some(header.into());
        self
    }

    /// Set the filename used when the response carries none.
    pub fn fallback_file_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_file_name = Some(name.into());
        self
    }

    /// Build the upload form with `sequencer`.
    pub fn sequence<S>(mut self, sequencer: S) -> Self
    where
        S: Fn(&mut MultipartForm, &[FilePart]) + Send + Sync + 'static,
    {
        self.enable_sequence = true;
        self.custom_sequence = Some(Arc::new(sequencer));
        self
    }

    /// Transform download responses with `transformer`.
    pub fn custom_download_response<T>(mut self, transformer: T) -> Self
    where
        T: DownloadTransformer + 'static,
    {
        self.custom_download_response = Some(Arc::new(transformer));
        self
    }

    /// Observe upload progress.
    pub fn on_upload_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(TransferProgress) + Send + Sync + 'static,
    {
        self.on_upload_progress = Some(Arc::new(callback));
        self
    }

    /// Observe download progress.
    pub fn on_download_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(TransferProgress) + Send + Sync + 'static,
    {
        self.on_download_progress = Some(Arc::new(callback));
        self
    }
}

impl std::fmt::Debug for StreamingDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingDescriptor")
            .field("request", &self.request)
            .field("mode", &self.mode)
            .field("files", &self.files.len())
            .field("file_field", &self.file_field)
            .field("response_type", &self.response_type)
            .field("response_content_disposition", &self.response_content_disposition)
            .field("fallback_file_name", &self.fallback_file_name)
            .field("enable_sequence", &self.enable_sequence)
            .finish_non_exhaustive()
    }
}
