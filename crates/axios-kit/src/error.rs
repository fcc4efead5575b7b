//! Error types for the request lifecycle layer.

use thiserror::Error;

/// Errors produced by [`AxiosKit`](crate::AxiosKit) and its collaborators.
#[derive(Debug, Clone, Error)]
pub enum KitError {
    /// An operation that needs a bound transport ran before `create()` or after `destroy()`.
    #[error("AxiosKit is not initialized; call create() first")]
    NotInitialized,
    /// Reserved. `create()` reinitializes an active facade instead, so no
    /// current operation returns this.
    #[error("AxiosKit is already initialized")]
    AlreadyInitialized,
    /// The loading counter was decremented without a matching increment.
    #[error("Loading counter decremented below zero")]
    Underflow,
    /// HTTP request failed.
    #[error("HTTP request error: {0}")]
    Request(String),
    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,
    /// Connection refused or failed.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Redirect limit exceeded.
    #[error("Too many redirects")]
    TooManyRedirects,
    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
    /// Request was aborted through its [`AbortController`](crate::AbortController).
    #[error("Request was cancelled")]
    Cancelled,
    /// HTTP error status reported without a status interceptor to handle it.
    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
        /// Optional error message from the response body.
        message: Option<String>,
    },
    /// The status interceptor rejected the response with the given reason.
    #[error("Rejected by status interceptor: {0}")]
    StatusRejected(serde_json::Value),
    /// The status interceptor dropped its resolver without settling the request.
    #[error("Status interceptor settled neither resolve nor reject")]
    StatusUnresolved,
    /// A response header could not be parsed.
    #[error("Malformed header: {0}")]
    MalformedHeader(String),
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KitError {
    /// Whether the error came from the transport (network or HTTP level).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Request(_)
                | Self::InvalidUrl(_)
                | Self::Timeout
                | Self::Connection(_)
                | Self::TooManyRedirects
                | Self::InvalidHeader(_)
                | Self::Io(_)
                | Self::Cancelled
                | Self::HttpStatus { .. }
        )
    }

    /// The HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for KitError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_redirect() {
            Self::TooManyRedirects
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<url::ParseError> for KitError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for KitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<std::io::Error> for KitError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<toml::de::Error> for KitError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for KitError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for KitError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// A specialized Result type for request lifecycle operations.
pub type Result<T> = std::result::Result<T, KitError>;
