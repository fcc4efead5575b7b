//! Logging facilities.
//!
//! AxiosKit uses the `tracing` crate for instrumentation. To see logs, install
//! a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! Internal diagnostics are emitted at `debug`/`trace` level. When
//! [`KitConfig::enable_log`](crate::KitConfig::enable_log) is set, every
//! settled request additionally emits one `info` (success) or `warn` (failure)
//! event on [`targets::REQUEST`], painted with the configured font colors.

use std::time::Duration;

use colored::Colorize;

use crate::config::KitConfig;
use crate::http::HttpMethod;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Facade lifecycle target.
    pub const KIT: &str = "axios_kit::kit";
    /// Loading counter target.
    pub const LOADING: &str = "axios_kit::loading";
    /// Interceptor registry target.
    pub const INTERCEPTOR: &str = "axios_kit::interceptor";
    /// Status interceptor target.
    pub const STATUS: &str = "axios_kit::status";
    /// Upload/download target.
    pub const STREAMING: &str = "axios_kit::streaming";
    /// Transport target.
    pub const TRANSPORT: &str = "axios_kit::transport";
    /// Per-request log target.
    pub const REQUEST: &str = "axios_kit::request";
}

/// Paint `text` with a `#rrggbb` or `#rgb` color.
///
/// Unparseable colors leave the text unpainted. Escape codes are only
/// emitted when `colored` decides the output supports them (a terminal,
/// no `NO_COLOR`), so file and JSON subscribers record plain text.
pub fn paint(color: &str, text: &str) -> String {
    match parse_hex(color) {
        Some((r, g, b)) => text.truecolor(r, g, b).to_string(),
        None => text.to_string(),
    }
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    match hex.len() {
        6 => Some((
            u8::from_str_radix(hex.get(0..2)?, 16).ok()?,
            u8::from_str_radix(hex.get(2..4)?, 16).ok()?,
            u8::from_str_radix(hex.get(4..6)?, 16).ok()?,
        )),
        3 => {
            let digit = |i: usize| {
                hex.get(i..=i)
                    .and_then(|d| u8::from_str_radix(d, 16).ok())
                    .map(|d| d * 17)
            };
            Some((digit(0)?, digit(1)?, digit(2)?))
        }
        _ => None,
    }
}

/// Emit the per-request log event if logging is enabled.
///
/// The configured color is also carried as a `color` field.
pub(crate) fn log_request(
    config: &KitConfig,
    method: HttpMethod,
    url: &str,
    status: Option<u16>,
    elapsed: Duration,
    error: Option<&str>,
) {
    if !config.enable_log {
        return;
    }
    let elapsed_ms = elapsed.as_millis() as u64;
    match error {
        None => {
            let color = config.success_font_color.as_str();
            let line = paint(
                color,
                &format!("[AxiosKit] {method} {url} -> {}", status.unwrap_or_default()),
            );
            tracing::info!(target: targets::REQUEST, %method, url, status, elapsed_ms, color, "{}", line);
        }
        Some(error) => {
            let color = config.error_font_color.as_str();
            let line = paint(color, &format!("[AxiosKit] {method} {url} failed: {error}"));
            tracing::warn!(target: targets::REQUEST, %method, url, status, elapsed_ms, color, "{}", line);
        }
    }
}
