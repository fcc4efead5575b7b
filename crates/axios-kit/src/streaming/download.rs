//! Binary download packaging and `Content-Disposition` filename extraction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{KitError, Result};
use crate::http::{ResponseData, TransportResponse};
use crate::logging::targets;

/// Filename used when nothing better is available.
pub const DEFAULT_DOWNLOAD_NAME: &str = "download";

/// Key of the filename entry in [`StreamPayload::stream_config`].
pub const FILE_NAME_KEY: &str = "fileName";

/// Turns a download response into a caller-defined value.
///
/// Implemented for any `Fn(&HeaderMap, Bytes) -> Result<Value>`.
pub trait DownloadTransformer: Send + Sync {
    /// Build the result from the response headers and body.
    fn transform(&self, headers: &http::HeaderMap, data: Bytes) -> Result<Value>;
}

impl<F> DownloadTransformer for F
where
    F: Fn(&http::HeaderMap, Bytes) -> Result<Value> + Send + Sync,
{
    fn transform(&self, headers: &http::HeaderMap, data: Bytes) -> Result<Value> {
        self(headers, data)
    }
}

/// Body of a [`DownloadEnvelope`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamPayload {
    /// Response headers (lowercase names) plus the resolved `fileName`.
    pub stream_config: BTreeMap<String, String>,
    /// The downloaded bytes.
    pub stream_result: Bytes,
}

/// Normalized result of a successful download.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEnvelope {
    /// HTTP status code.
    pub code: u16,
    /// Canonical reason phrase of `code`.
    pub message: String,
    /// Headers, filename and content.
    pub data: StreamPayload,
}

impl DownloadEnvelope {
    /// The resolved filename.
    pub fn file_name(&self) -> &str {
        self.data
            .stream_config
            .get(FILE_NAME_KEY)
            .map(String::as_str)
            .unwrap_or(DEFAULT_DOWNLOAD_NAME)
    }

    /// The downloaded bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.data.stream_result
    }

    /// A response header, by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.data.stream_config.get(name).map(String::as_str)
    }
}

/// Extract the filename from a `Content-Disposition` value.
///
/// `filename*` (RFC 5987, UTF-8 or ISO-8859-1) takes precedence over
/// `filename`. Plain filenames may be quoted and may be percent-encoded.
/// Returns `Ok(None)` when the header names no file.
pub fn content_disposition_filename(header: &str) -> Result<Option<String>> {
    let mut plain = None;
    let mut extended = None;

    for param in split_params(header)? {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "filename*" => extended = Some(decode_extended(value.trim())?),
            "filename" => plain = Some(decode_plain(value.trim())),
            _ => {}
        }
    }

    Ok(extended.or(plain).filter(|name| !name.is_empty()))
}

/// Split on `;` outside quoted strings.
fn split_params(header: &str) -> Result<Vec<&str>> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in header.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(KitError::MalformedHeader(format!(
            "unterminated quoted string in {header:?}"
        )));
    }
    params.push(&header[start..]);
    Ok(params)
}

fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn decode_plain(value: &str) -> String {
    let value = unquote(value);
    if !value.contains('%') {
        return value;
    }
    // Not every server encodes; a stray '%' keeps the raw name.
    let decoded = percent_decode_str(&value)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned());
    decoded.unwrap_or(value)
}

fn decode_extended(value: &str) -> Result<String> {
    let value = unquote(value);
    let mut fields = value.splitn(3, '\'');
    let (Some(charset), Some(_language), Some(encoded)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(KitError::MalformedHeader(format!(
            "filename* without charset: {value:?}"
        )));
    };

    let decoded = percent_decode_str(encoded);
    match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => decoded
            .decode_utf8()
            .map(|s| s.into_owned())
            .map_err(|e| KitError::MalformedHeader(format!("filename* is not UTF-8: {e}"))),
        "iso-8859-1" | "latin1" => Ok(decoded.map(char::from).collect()),
        other => Err(KitError::MalformedHeader(format!(
            "unsupported filename* charset {other:?}"
        ))),
    }
}

/// Read the filename from `header_name` (default `Content-Disposition`).
///
/// Malformed headers are logged and treated as absent.
pub fn extract_file_name(headers: &http::HeaderMap, header_name: Option<&str>) -> Option<String> {
    let header_name = header_name.unwrap_or("content-disposition");
    let value = headers.get(header_name)?;
    let Ok(value) = value.to_str() else {
        tracing::warn!(target: targets::STREAMING, header = header_name, "non-ASCII disposition header ignored");
        return None;
    };
    match content_disposition_filename(value) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!(target: targets::STREAMING, header = header_name, error = %e, "ignoring malformed disposition header");
            None
        }
    }
}

/// Last non-empty path segment of `url`, percent-decoded.
fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.rev().find(|s| !s.is_empty())?;
    Some(percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

/// Resolve the filename of a download.
///
/// Order: disposition header, caller fallback, last URL path segment,
/// [`DEFAULT_DOWNLOAD_NAME`].
pub fn resolve_file_name(
    response: &TransportResponse,
    header_name: Option<&str>,
    fallback: Option<&str>,
) -> String {
    extract_file_name(&response.headers, header_name)
        .or_else(|| fallback.map(str::to_string))
        .or_else(|| file_name_from_url(&response.url))
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string())
}

/// Raw bytes of a response body, whatever it was decoded as.
pub(crate) fn body_bytes(data: ResponseData) -> Bytes {
    match data {
        ResponseData::Empty => Bytes::new(),
        ResponseData::Binary(bytes) => bytes,
        ResponseData::Text(text) => Bytes::from(text),
        ResponseData::Json(value) => Bytes::from(value.to_string()),
    }
}

/// Package a successful download response.
pub fn package_download(
    response: TransportResponse,
    header_name: Option<&str>,
    fallback: Option<&str>,
) -> DownloadEnvelope {
    let file_name = resolve_file_name(&response, header_name, fallback);

    let mut stream_config = BTreeMap::new();
    for name in response.headers.keys() {
        let joined = response
            .headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        stream_config.insert(name.as_str().to_string(), joined);
    }
    stream_config.insert(FILE_NAME_KEY.to_string(), file_name);

    let message = http::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("OK")
        .to_string();

    DownloadEnvelope {
        code: response.status,
        message,
        data: StreamPayload {
            stream_config,
            stream_result: body_bytes(response.data),
        },
    }
}

/// Re-decode a failed download's binary body so it can be inspected.
pub(crate) fn reinterpret_error_body(mut response: TransportResponse) -> TransportResponse {
    if let ResponseData::Binary(bytes) = &response.data {
        response.data = ResponseData::from_json_or_text(bytes);
    }
    response
}

/// Write a download to `dir` under its sanitized filename.
///
/// Creates `dir` if needed and returns the written path.
pub async fn save_stream_file(envelope: &DownloadEnvelope, dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let mut name = sanitize_filename::sanitize(envelope.file_name());
    if name.is_empty() {
        name = DEFAULT_DOWNLOAD_NAME.to_string();
    }

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, envelope.bytes()).await?;
    tracing::debug!(target: targets::STREAMING, path = %path.display(), bytes = envelope.bytes().len(), "download saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_filename() {
        let name = content_disposition_filename(r#"attachment; filename="report.pdf""#).unwrap();
        assert_eq!(name.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn test_unquoted_filename() {
        let name = content_disposition_filename("attachment; filename=report.pdf").unwrap();
        assert_eq!(name.as_deref(), Some("report.pdf"));
    }

    #[test]
    fn test_rfc5987_utf8() {
        let name =
            content_disposition_filename("attachment; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf").unwrap();
        assert_eq!(name.as_deref(), Some("résumé.pdf"));
    }

    #[test]
    fn test_rfc5987_latin1() {
        let name = content_disposition_filename("attachment; filename*=iso-8859-1'en'caf%E9.txt").unwrap();
        assert_eq!(name.as_deref(), Some("café.txt"));
    }

    #[test]
    fn test_extended_wins_over_plain() {
        let header = r#"attachment; filename*=UTF-8''%E6%8A%A5%E5%91%8A.xlsx; filename="report.xlsx""#;
        let name = content_disposition_filename(header).unwrap();
        assert_eq!(name.as_deref(), Some("报告.xlsx"));
    }

    #[test]
    fn test_percent_encoded_plain() {
        let name = content_disposition_filename("attachment; filename=%E6%8A%A5%E5%91%8A.xlsx").unwrap();
        assert_eq!(name.as_deref(), Some("报告.xlsx"));
        let name = content_disposition_filename("attachment; filename=100%.txt").unwrap();
        assert_eq!(name.as_deref(), Some("100%.txt"));
    }

    #[test]
    fn test_semicolon_inside_quotes() {
        let name = content_disposition_filename(r#"attachment; filename="a;b \"c\".txt""#).unwrap();
        assert_eq!(name.as_deref(), Some(r#"a;b "c".txt"#));
    }

    #[test]
    fn test_no_filename() {
        assert_eq!(content_disposition_filename("inline").unwrap(), None);
        assert_eq!(content_disposition_filename("attachment; filename=\"\"").unwrap(), None);
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            content_disposition_filename(r#"attachment; filename="broken"#),
            Err(KitError::MalformedHeader(_))
        ));
        assert!(matches!(
            content_disposition_filename("attachment; filename*=r%C3%A9sum%C3%A9.pdf"),
            Err(KitError::MalformedHeader(_))
        ));
        assert!(matches!(
            content_disposition_filename("attachment; filename*=UTF-8''%FF.pdf"),
            Err(KitError::MalformedHeader(_))
        ));
    }

    fn download(headers: &[(&str, &str)], url: &str) -> TransportResponse {
        let mut response = TransportResponse::new(200, ResponseData::Binary(Bytes::from_static(b"%PDF")));
        for (name, value) in headers {
            response.headers.append(
                http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                http::HeaderValue::from_str(value).unwrap(),
            );
        }
        response.url = url.to_string();
        response
    }

    #[test]
    fn test_file_name_fallback_order() {
        let bare = download(&[], "https://cdn.example.com/files/q3%20summary.pdf");
        assert_eq!(resolve_file_name(&bare, None, Some("fallback.bin")), "fallback.bin");
        assert_eq!(resolve_file_name(&bare, None, None), "q3 summary.pdf");

        let root = download(&[], "https://cdn.example.com/");
        assert_eq!(resolve_file_name(&root, None, None), DEFAULT_DOWNLOAD_NAME);

        let broken = download(&[("content-disposition", "attachment; filename=\"x")], "");
        assert_eq!(resolve_file_name(&broken, None, Some("safe.bin")), "safe.bin");
    }

    #[test]
    fn test_custom_disposition_header() {
        let response = download(
            &[
                ("content-disposition", "attachment; filename=ignored.pdf"),
                ("x-file-disposition", "attachment; filename=custom.pdf"),
            ],
            "",
        );
        assert_eq!(
            resolve_file_name(&response, Some("x-file-disposition"), None),
            "custom.pdf"
        );
    }

    #[test]
    fn test_package_download() {
        let response = download(
            &[
                ("content-type", "application/pdf"),
                ("content-disposition", "attachment; filename=\"report.pdf\""),
                ("set-cookie", "a=1"),
                ("set-cookie", "b=2"),
            ],
            "https://api.example.com/export",
        );
        let envelope = package_download(response, None, None);

        assert_eq!(envelope.code, 200);
        assert_eq!(envelope.message, "OK");
        assert_eq!(envelope.file_name(), "report.pdf");
        assert_eq!(envelope.header("content-type"), Some("application/pdf"));
        assert_eq!(envelope.header("set-cookie"), Some("a=1, b=2"));
        assert_eq!(envelope.bytes().as_ref(), b"%PDF");

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["data"]["streamConfig"]["fileName"], "report.pdf");
        assert!(json["data"]["streamResult"].is_array());
    }

    #[test]
    fn test_reinterpret_error_body() {
        let response = TransportResponse::new(
            404,
            ResponseData::Binary(Bytes::from_static(br#"{"message":"gone"}"#)),
        );
        let response = reinterpret_error_body(response);
        assert_eq!(response.data.summary().as_deref(), Some("gone"));
    }

    #[tokio::test]
    async fn test_save_stream_file_sanitizes_name() {
        let dir = tempfile::tempdir().unwrap();
        let response = download(&[("content-disposition", "attachment; filename=\"../../etc/passwd\"")], "");
        let envelope = package_download(response, None, None);

        let path = save_stream_file(&envelope, dir.path().join("out")).await.unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF");
    }
}
