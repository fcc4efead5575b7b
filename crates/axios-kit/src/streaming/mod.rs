//! Upload and download streaming.
//!
//! Uploads turn a list of [`FilePart`](crate::http::FilePart)s into a
//! multipart body. Downloads force a binary response and package it as a
//! [`DownloadEnvelope`]:
//!
//! ```json
//! { "code": 200, "message": "OK",
//!   "data": { "streamConfig": { "content-type": "...", "fileName": "report.pdf" },
//!             "streamResult": [37, 80, 68, 70] } }
//! ```

mod download;
mod upload;

pub use download::{
    DEFAULT_DOWNLOAD_NAME, DownloadEnvelope, DownloadTransformer, FILE_NAME_KEY, StreamPayload,
    content_disposition_filename, extract_file_name, package_download, resolve_file_name,
    save_stream_file,
};
pub(crate) use download::{body_bytes, reinterpret_error_body};
pub use upload::{FormSequencer, build_upload_form};

use serde_json::Value;

use crate::error::Result;

/// Result of [`AxiosKit::streaming`](crate::AxiosKit::streaming).
#[derive(Clone, Debug, PartialEq)]
pub enum StreamingOutput {
    /// Settled value of a plain request, an upload, or a transformed download.
    Value(Value),
    /// A packaged download.
    Download(DownloadEnvelope),
}

impl StreamingOutput {
    /// The packaged download, if this is one.
    pub fn as_download(&self) -> Option<&DownloadEnvelope> {
        match self {
            Self::Download(envelope) => Some(envelope),
            Self::Value(_) => None,
        }
    }

    /// Take the packaged download, if this is one.
    pub fn into_download(self) -> Option<DownloadEnvelope> {
        match self {
            Self::Download(envelope) => Some(envelope),
            Self::Value(_) => None,
        }
    }

    /// Convert to JSON, serializing a download envelope in its wire shape.
    pub fn into_value(self) -> Result<Value> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Download(envelope) => Ok(serde_json::to_value(envelope)?),
        }
    }
}
