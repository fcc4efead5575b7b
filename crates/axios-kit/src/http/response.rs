//! Transport-level response types.

use bytes::Bytes;
use serde_json::Value;

/// The decoded body of a transport response.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ResponseData {
    /// No body.
    #[default]
    Empty,
    /// A JSON document.
    Json(Value),
    /// Text that is not JSON.
    Text(String),
    /// Raw bytes.
    Binary(Bytes),
}

impl ResponseData {
    /// Decode raw bytes as JSON when possible, else as text.
    pub fn from_json_or_text(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Convert the payload into a JSON value.
    ///
    /// Binary payloads become an array of byte values, which deserializes
    /// into `Vec<u8>`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
            Self::Binary(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
        }
    }

    /// A short human-readable rendering, used for error messages.
    pub fn summary(&self) -> Option<String> {
        match self {
            Self::Empty | Self::Binary(_) => None,
            Self::Json(value) => value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(value.to_string())),
            Self::Text(text) => Some(text.clone()),
        }
    }
}

/// An HTTP response produced by a [`Transport`](super::Transport).
#[derive(Clone, Debug)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: http::HeaderMap,
    /// Final URL after redirects.
    pub url: String,
    /// Decoded body.
    pub data: ResponseData,
}

impl TransportResponse {
    /// Create a response with no headers.
    pub fn new(status: u16, data: ResponseData) -> Self {
        Self {
            status,
            headers: http::HeaderMap::new(),
            url: String::new(),
            data,
        }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Progress information for downloads/uploads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferProgress {
    /// Number of bytes transferred so far.
    pub bytes_transferred: u64,
    /// Total number of bytes, if known.
    pub total_bytes: Option<u64>,
}

impl TransferProgress {
    /// Get the progress as a fraction (0.0 to 1.0), if total is known.
    pub fn fraction(&self) -> Option<f64> {
        self.total_bytes.map(|total| {
            if total == 0 {
                1.0
            } else {
                self.bytes_transferred as f64 / total as f64
            }
        })
    }

    /// Get the progress as a percentage (0 to 100), if total is known.
    pub fn percent(&self) -> Option<u8> {
        self.fraction().map(|f| (f * 100.0).min(100.0) as u8)
    }
}
