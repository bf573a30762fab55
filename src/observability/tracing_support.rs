//! Tracing integration for structured logging and spans.

use tracing::{Level, Span, span};

/// Create a span for one calculate call.
///
/// # Example
///
/// ```rust,ignore
/// use seriesforge::observability::span_calculate;
///
/// let span = span_calculate("moving_average", "speed (smoothed)");
/// let _guard = span.enter();
/// // Calculation here...
/// ```
#[inline]
pub fn span_calculate(transform: &str, alias: &str) -> Span {
    span!(Level::DEBUG, "calculate", transform = %transform, alias = %alias)
}

/// Create a span for loading one plugin module.
#[inline]
pub fn span_plugin_load(path: &str) -> Span {
    span!(Level::INFO, "plugin_load", path = %path)
}

/// Log a plugin module accepted by the host.
#[inline]
pub fn trace_plugin_loaded(plugin: &str, version: &str, transforms: &[String]) {
    tracing::info!(
        plugin = %plugin,
        version = %version,
        transforms = ?transforms,
        "plugin loaded"
    );
}

/// Log a plugin module rejected by the host.
#[inline]
pub fn trace_plugin_rejected(path: &str, error: &dyn std::error::Error) {
    tracing::warn!(
        path = %path,
        error = %error,
        "plugin rejected"
    );
}
