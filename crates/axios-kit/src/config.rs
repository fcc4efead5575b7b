//! Configuration for the facade and for transport instances.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{KitError, Result};

/// Default color for successful request logs.
pub const DEFAULT_SUCCESS_FONT_COLOR: &str = "#67c23a";

/// Default color for failed request logs.
pub const DEFAULT_ERROR_FONT_COLOR: &str = "#f56c6c";

/// Configuration for an [`AxiosKit`](crate::AxiosKit) instance.
///
/// Keys deserialize in camelCase so the same document can be shared with
/// front-end tooling:
///
/// ```ignore
/// let config = KitConfig::from_toml_str(r#"
///     enableEmptyParamsFiltering = true
///     enableLog = true
///     successFontColor = "#00ff00"
/// "#)?;
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KitConfig {
    /// Drop `null` and empty-string query parameters before dispatch.
    pub enable_empty_params_filtering: bool,
    /// Emit one log event per settled request.
    pub enable_log: bool,
    /// Color (`#rrggbb` or `#rgb`) used to paint successful request logs.
    pub success_font_color: String,
    /// Color (`#rrggbb` or `#rgb`) used to paint failed request logs.
    pub error_font_color: String,
}

impl Default for KitConfig {
    fn default() -> Self {
        Self {
            enable_empty_params_filtering: false,
            enable_log: false,
            success_font_color: DEFAULT_SUCCESS_FONT_COLOR.to_string(),
            error_font_color: DEFAULT_ERROR_FONT_COLOR.to_string(),
        }
    }
}

impl KitConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a TOML document.
    ///
    /// Missing keys take their default values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load a configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            KitError::Config(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Enable filtering of empty query parameters.
    pub fn empty_params_filtering(mut self, enabled: bool) -> Self {
        self.enable_empty_params_filtering = enabled;
        self
    }

    /// Enable per-request logging.
    pub fn log(mut self, enabled: bool) -> Self {
        self.enable_log = enabled;
        self
    }

    /// Set the colors used by per-request logging.
    pub fn font_colors(mut self, success: impl Into<String>, error: impl Into<String>) -> Self {
        self.success_font_color = success.into();
        self.error_font_color = error.into();
        self
    }
}

/// Base settings applied to every request of a transport instance.
///
/// This is what `create()` receives alongside the transport.
#[derive(Clone, Debug, Default)]
pub struct BaseConfig {
    /// Prefix for relative request paths.
    pub base_url: String,
    /// Headers sent with every request unless the request overrides them.
    pub headers: http::HeaderMap,
    /// Default per-request timeout.
    pub timeout: Option<Duration>,
}

impl BaseConfig {
    /// Create base settings for the given URL prefix.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Add a default header.
    pub fn header(
        mut self,
        name: impl TryInto<http::HeaderName>,
        value: impl TryInto<http::HeaderValue>,
    ) -> Self {
        if let (Ok(name), Ok(value)) = (name.try_into(), value.try_into()) {
            self.headers.insert(name, value);
        } else {
            tracing::warn!(target: crate::logging::targets::KIT, "Ignoring invalid default header");
        }
        self
    }

    /// Set the default timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Resolve a request path against the base URL.
    ///
    /// Absolute URLs are returned unchanged.
    pub fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") || self.base_url.is_empty() {
            return path.to_string();
        }
        if path.is_empty() {
            return self.base_url.clone();
        }
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        format!("{}{}", self.base_url, path)
    }
}
