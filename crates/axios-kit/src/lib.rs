//! Request lifecycle layer for HTTP clients.
//!
//! This crate sits between application code and an HTTP transport and gives
//! every request the same lifecycle:
//!
//! - **Interceptors**: request/response chains attached and detached by id
//! - **Status interception**: one global hook that decides how each response settles
//! - **Loading tracking**: start/stop callbacks driven by the number of in-flight requests
//! - **Streaming**: multipart uploads and binary downloads with filename extraction
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use axios_kit::{AxiosKit, BaseConfig, KitConfig, ReqwestTransport, RequestDescriptor};
//!
//! let kit = AxiosKit::new(KitConfig::new().log(true));
//! kit.create(
//!     Arc::new(ReqwestTransport::new()?),
//!     BaseConfig::new("https://api.example.com").header("x-app", "demo"),
//!     None,
//! );
//!
//! let users: Vec<User> = kit
//!     .request(RequestDescriptor::get("/users").params(serde_json::json!({"page": 1})))
//!     .await?;
//! ```
//!
//! ## Interceptors
//!
//! ```ignore
//! let id = kit.use_request_interceptors(
//!     Some(Arc::new(|mut request: TransportRequest| {
//!         request.headers.insert("authorization", token_header()?);
//!         Ok(request)
//!     })),
//!     None,
//! )?;
//! kit.destroy_request_interceptors(id);
//! ```
//!
//! ## Loading
//!
//! ```ignore
//! kit.use_loading(|| spinner.show(), || spinner.hide());
//! ```
//!
//! Overlapping requests produce one `show` and one `hide`. Requests built
//! with `disable_loading(true)` are not counted.
//!
//! ## Streaming
//!
//! ```ignore
//! // Upload: every file under "file", then the data fields
//! kit.streaming(
//!     StreamingDescriptor::upload("/files", vec![FilePart::from_path("a.pdf").await?])
//!         .map_request(|r| r.data(serde_json::json!({"folder": "docs"})))
//!         .on_upload_progress(|p| println!("{:?}%", p.percent())),
//! )
//! .await?;
//!
//! // Download: packaged with the server's filename
//! let output = kit.streaming(StreamingDescriptor::download("/export")).await?;
//! if let Some(envelope) = output.into_download() {
//!     save_stream_file(&envelope, "downloads").await?;
//! }
//! ```
//!
//! # Logging
//!
//! Diagnostics go through `tracing` under the targets in [`logging::targets`].
//! With [`KitConfig::enable_log`] set, every settled request also emits one
//! event on `axios_kit::request`, painted with the configured colors.

mod abort;
mod config;
mod descriptor;
mod error;
pub mod http;
mod interceptor;
mod kit;
mod loading;
pub mod logging;
pub mod params;
mod status;
pub mod streaming;

pub use abort::{AbortController, AbortGenerator, AbortSignal};
pub use config::{BaseConfig, DEFAULT_ERROR_FONT_COLOR, DEFAULT_SUCCESS_FONT_COLOR, KitConfig};
pub use descriptor::{DEFAULT_FILE_FIELD, RequestDescriptor, StreamingDescriptor, StreamingMode};
pub use error::{KitError, Result};
pub use interceptor::{
    FulfilledHandler, InterceptorId, InterceptorManager, InterceptorPair, RejectedHandler,
};
pub use kit::{AxiosKit, KitState};
pub use loading::{LoadingCallback, LoadingCounter, LoadingGuard};
pub use status::{Resolver, StatusContext, StatusInterceptor, default_outcome};

// Re-export commonly used types at the crate root
pub use http::{
    FilePart, HttpMethod, MultipartForm, ReqwestTransport, ResponseData, ResponseType, Transport,
    TransportRequest, TransportResponse,
};
pub use params::{QuerySerializer, UrlEncodedSerializer};
pub use streaming::{DownloadEnvelope, DownloadTransformer, FormSequencer, StreamingOutput, save_stream_file};
