//! [`Transport`] implementation backed by `reqwest`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use reqwest::redirect::Policy;

use super::request::{
    FilePart, MultipartForm, PartValue, ProgressCallback, RequestBody, ResponseType,
    TransportRequest,
};
use super::response::{ResponseData, TransferProgress, TransportResponse};
use super::transport::Transport;
use crate::error::{KitError, Result};
use crate::logging::targets;

/// Size of the chunks file bodies are streamed in when upload progress is observed.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// File name browsers give to anonymous blobs in multipart forms.
const BLOB_FILE_NAME: &str = "blob";

/// Connection settings for [`ReqwestTransport`].
#[derive(Clone, Debug)]
pub struct ReqwestTransportConfig {
    /// Client-wide request timeout.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Whether to follow redirects.
    pub follow_redirects: bool,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
    /// Whether to enable cookie storage.
    pub cookies_enabled: bool,
    /// Default user agent.
    pub user_agent: Option<String>,
    /// Proxy URL.
    pub proxy: Option<String>,
}

impl Default for ReqwestTransportConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Some(Duration::from_secs(10)),
            follow_redirects: true,
            max_redirects: 10,
            cookies_enabled: true,
            user_agent: Some(format!("AxiosKit/{} (Rust)", env!("CARGO_PKG_VERSION"))),
            proxy: None,
        }
    }
}

/// Builder for [`ReqwestTransport`].
pub struct ReqwestTransportBuilder {
    config: ReqwestTransportConfig,
    default_headers: http::HeaderMap,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransportBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ReqwestTransportConfig::default(),
            default_headers: http::HeaderMap::new(),
        }
    }

    /// Set the client-wide request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Disable redirect following.
    pub fn no_redirects(mut self) -> Self {
        self.config.follow_redirects = false;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Disable cookie storage.
    pub fn no_cookies(mut self) -> Self {
        self.config.cookies_enabled = false;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Route every request through a proxy.
    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy_url.into());
        self
    }

    /// Add a header sent with every request.
    pub fn default_header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Result<Self> {
        let name = name
            .try_into()
            .map_err(|_| KitError::InvalidHeader("Invalid header name".to_string()))?;
        let value = value
            .try_into()
            .map_err(|_| KitError::InvalidHeader("Invalid header value".to_string()))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Build the transport.
    pub fn build(self) -> Result<ReqwestTransport> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        if self.config.follow_redirects {
            builder = builder.redirect(Policy::limited(self.config.max_redirects));
        } else {
            builder = builder.redirect(Policy::none());
        }

        if self.config.cookies_enabled {
            builder = builder.cookie_store(true);
        }

        if let Some(ref ua) = self.config.user_agent {
            builder = builder.user_agent(ua);
        }

        if let Some(ref proxy_url) = self.config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| KitError::Config(format!("invalid proxy {proxy_url}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        builder = builder.default_headers(self.default_headers);

        Ok(ReqwestTransport {
            client: builder.build()?,
            config: self.config,
        })
    }
}

/// A [`Transport`] that executes requests with a `reqwest::Client`.
///
/// Cheap to clone; clones share the connection pool.
///
/// ```ignore
/// let transport = ReqwestTransport::builder()
///     .connect_timeout(Duration::from_secs(3))
///     .user_agent("my-app/1.0")
///     .build()?;
/// kit.create(Arc::new(transport), BaseConfig::new("https://api.example.com"), None);
/// ```
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: ReqwestTransportConfig,
}

impl ReqwestTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Result<Self> {
        ReqwestTransportBuilder::new().build()
    }

    /// Create a builder for configuring a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    /// Wrap an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            config: ReqwestTransportConfig::default(),
        }
    }

    /// The transport's configuration.
    pub fn config(&self) -> &ReqwestTransportConfig {
        &self.config
    }

    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let TransportRequest {
            method,
            url,
            headers,
            query,
            body,
            response_type,
            timeout,
            on_upload_progress,
            on_download_progress,
        } = request;

        let mut url = url::Url::parse(&url)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }

        let mut builder = self.client.request(method.to_reqwest(), url).headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        builder = match body {
            RequestBody::None => builder,
            RequestBody::Text(text) => builder.body(text),
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(pairs) => builder.form(&pairs),
            RequestBody::Bytes(data) => {
                let progress = on_upload_progress
                    .map(|callback| Arc::new(UploadProgress::new(callback, data.len() as u64)));
                builder.body(body_with_progress(data, progress))
            }
            RequestBody::Multipart(form) => {
                let progress = on_upload_progress
                    .map(|callback| Arc::new(UploadProgress::new(callback, form.file_bytes())));
                builder.multipart(into_reqwest_form(form, progress))
            }
        };

        let mut response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let final_url = response.url().to_string();
        let total_bytes = response.content_length();

        let mut buffer = Vec::with_capacity(total_bytes.unwrap_or(0) as usize);
        while let Some(chunk) = response.chunk().await? {
            buffer.extend_from_slice(&chunk);
            if let Some(ref callback) = on_download_progress {
                callback(TransferProgress {
                    bytes_transferred: buffer.len() as u64,
                    total_bytes,
                });
            }
        }
        tracing::trace!(target: targets::TRANSPORT, status, bytes = buffer.len(), "response body received");

        let data = match response_type {
            ResponseType::Json => ResponseData::from_json_or_text(&buffer),
            ResponseType::Text if buffer.is_empty() => ResponseData::Empty,
            ResponseType::Text => ResponseData::Text(String::from_utf8_lossy(&buffer).into_owned()),
            ResponseType::Binary => ResponseData::Binary(Bytes::from(buffer)),
        };

        Ok(TransportResponse {
            status,
            headers,
            url: final_url,
            data,
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<TransportResponse>> {
        Box::pin(self.execute(request))
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Upload progress shared by every streamed part of one request.
struct UploadProgress {
    callback: ProgressCallback,
    sent: AtomicU64,
    total: u64,
}

impl UploadProgress {
    fn new(callback: ProgressCallback, total: u64) -> Self {
        Self {
            callback,
            sent: AtomicU64::new(0),
            total,
        }
    }

    fn advance(&self, bytes: usize) {
        let sent = self.sent.fetch_add(bytes as u64, Ordering::AcqRel) + bytes as u64;
        (self.callback)(TransferProgress {
            bytes_transferred: sent,
            total_bytes: Some(self.total),
        });
    }
}

fn body_with_progress(data: Bytes, progress: Option<Arc<UploadProgress>>) -> reqwest::Body {
    let Some(progress) = progress else {
        return reqwest::Body::from(data);
    };
    let stream = futures_util::stream::iter(split_chunks(&data)).map(move |chunk| {
        progress.advance(chunk.len());
        Ok::<_, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(stream)
}

fn split_chunks(data: &Bytes) -> Vec<Bytes> {
    (0..data.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| data.slice(start..(start + UPLOAD_CHUNK_SIZE).min(data.len())))
        .collect()
}

fn file_part(file: &FilePart, progress: Option<Arc<UploadProgress>>) -> reqwest::multipart::Part {
    let length = file.data.len() as u64;
    let file_name = file
        .file_name
        .clone()
        .unwrap_or_else(|| BLOB_FILE_NAME.to_string());
    reqwest::multipart::Part::stream_with_length(body_with_progress(file.data.clone(), progress), length)
        .file_name(file_name)
}

fn into_reqwest_form(form: MultipartForm, progress: Option<Arc<UploadProgress>>) -> reqwest::multipart::Form {
    form.parts()
        .iter()
        .fold(reqwest::multipart::Form::new(), |out, entry| match &entry.value {
            PartValue::Text(text) => out.text(entry.name.clone(), text.clone()),
            PartValue::File(file) => {
                let part = file_part(file, progress.clone());
                // mime_str consumes the part, so rebuild it if the type is rejected.
                let part = match &file.mime_type {
                    Some(mime) => part.mime_str(mime).unwrap_or_else(|e| {
                        tracing::warn!(target: targets::TRANSPORT, "Invalid MIME type '{}': {}", mime, e);
                        file_part(file, progress.clone())
                    }),
                    None => part,
                };
                out.part(entry.name.clone(), part)
            }
        })
}
