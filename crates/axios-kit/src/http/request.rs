//! Transport-level request types.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use super::response::TransferProgress;
use crate::error::KitError;

/// HTTP request methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP PATCH method.
    Patch,
    /// HTTP HEAD method.
    Head,
    /// HTTP OPTIONS method.
    Options,
}

impl HttpMethod {
    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }

    /// Whether the payload of this method travels in the query string.
    ///
    /// Used by data auto-differentiation: GET, HEAD, DELETE and OPTIONS send
    /// their payload as query parameters, the others as a body.
    pub fn is_query_style(self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Delete | Self::Options)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

impl FromStr for HttpMethod {
    type Err = KitError;

    /// Parse a method name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(KitError::Request(format!("Unsupported HTTP method: {other}"))),
        }
    }
}

/// How the transport should decode the response body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// Parse JSON when possible, fall back to text.
    #[default]
    Json,
    /// Decode as UTF-8 text.
    Text,
    /// Keep the raw bytes.
    Binary,
}

impl FromStr for ResponseType {
    type Err = KitError;

    /// Parse a response-type hint (`json`, `text`, `blob`, `arraybuffer`, `stream`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" | "" => Ok(Self::Json),
            "text" | "document" => Ok(Self::Text),
            "blob" | "arraybuffer" | "stream" | "binary" => Ok(Self::Binary),
            other => Err(KitError::Request(format!("Unsupported response type: {other}"))),
        }
    }
}

/// A file (or anonymous blob) attached to an upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
    /// File name reported to the server.
    pub file_name: Option<String>,
    /// MIME type of the content.
    pub mime_type: Option<String>,
    /// File content.
    pub data: Bytes,
}

impl FilePart {
    /// Create a named file part.
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            mime_type: None,
            data: data.into(),
        }
    }

    /// Create an anonymous blob part.
    pub fn blob(data: impl Into<Bytes>) -> Self {
        Self {
            file_name: None,
            mime_type: None,
            data: data.into(),
        }
    }

    /// Set the MIME type.
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Read a file from disk, naming the part after the file.
    pub async fn from_path(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        Ok(Self {
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            mime_type: None,
            data: data.into(),
        })
    }

    /// Content length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the part has no content.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The value of a multipart form entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartValue {
    /// A plain text field.
    Text(String),
    /// A file field.
    File(FilePart),
}

/// A named multipart form entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormPart {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: PartValue,
}

/// Multipart form data for file uploads.
///
/// Unlike `reqwest::multipart::Form` this is inspectable and cloneable, so
/// interceptors and sequencers can see exactly what will be sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    /// Create a new empty multipart form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field to the form.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append_text(name, value);
        self
    }

    /// Add a file field to the form.
    pub fn file(mut self, name: impl Into<String>, file: FilePart) -> Self {
        self.append_file(name, file);
        self
    }

    /// Append a text field in place.
    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parts.push(FormPart {
            name: name.into(),
            value: PartValue::Text(value.into()),
        });
    }

    /// Append a file field in place.
    pub fn append_file(&mut self, name: impl Into<String>, file: FilePart) {
        self.parts.push(FormPart {
            name: name.into(),
            value: PartValue::File(file),
        });
    }

    /// All entries in insertion order.
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Entries registered under `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormPart> + 'a {
        self.parts.iter().filter(move |p| p.name == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the form has no entries.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Total size of all file contents.
    pub fn file_bytes(&self) -> u64 {
        self.parts
            .iter()
            .map(|p| match &p.value {
                PartValue::File(f) => f.data.len() as u64,
                PartValue::Text(_) => 0,
            })
            .sum()
    }
}

/// The body of a transport request.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// Plain text body.
    Text(String),
    /// JSON body.
    Json(serde_json::Value),
    /// URL-encoded form data.
    Form(Vec<(String, String)>),
    /// Raw binary body.
    Bytes(Bytes),
    /// Multipart form body.
    Multipart(MultipartForm),
}

/// Callback receiving transfer progress.
pub type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// A fully described request handed to a [`Transport`](super::Transport).
#[derive(Clone)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The request URL (absolute once the instance has applied its base URL).
    pub url: String,
    /// Request headers.
    pub headers: http::HeaderMap,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
    /// How to decode the response body.
    pub response_type: ResponseType,
    /// Request timeout override.
    pub timeout: Option<Duration>,
    /// Upload progress callback.
    pub on_upload_progress: Option<ProgressCallback>,
    /// Download progress callback.
    pub on_download_progress: Option<ProgressCallback>,
}

impl TransportRequest {
    /// Create a request with no body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: http::HeaderMap::new(),
            query: Vec::new(),
            body: RequestBody::None,
            response_type: ResponseType::default(),
            timeout: None,
            on_upload_progress: None,
            on_download_progress: None,
        }
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }
}

impl fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("response_type", &self.response_type)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
