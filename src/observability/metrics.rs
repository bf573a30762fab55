//! Metrics collection using metrics-rs.

use metrics::{Unit, counter, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

const TRANSFORMS_REGISTERED: &str = "seriesforge_transforms_registered";
const TRANSFORMS_CREATED: &str = "seriesforge_transforms_created";
const CALCULATIONS: &str = "seriesforge_calculations";
const POINTS_PRODUCED: &str = "seriesforge_points_produced";
const CALCULATE_TIME_NS: &str = "seriesforge_calculate_time_ns";
const PLUGINS_LOADED: &str = "seriesforge_plugins_loaded";

/// Initialize metrics descriptions.
///
/// Call this once at application startup before using any metrics.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        TRANSFORMS_REGISTERED,
        Unit::Count,
        "Transform types registered with a factory"
    );
    metrics::describe_counter!(
        TRANSFORMS_CREATED,
        Unit::Count,
        "Transform instances created by a factory"
    );
    metrics::describe_counter!(CALCULATIONS, Unit::Count, "Calls to calculate");
    metrics::describe_counter!(
        POINTS_PRODUCED,
        Unit::Count,
        "Samples appended to destination series"
    );
    metrics::describe_histogram!(
        CALCULATE_TIME_NS,
        Unit::Nanoseconds,
        "Time spent in a single calculate call"
    );
    metrics::describe_counter!(PLUGINS_LOADED, Unit::Count, "Plugin modules loaded");
}

/// Record a transform type registered with a factory.
#[inline]
pub fn record_transform_registered(transform: &str) {
    counter!(TRANSFORMS_REGISTERED, "transform" => transform.to_string()).increment(1);
}

/// Record a transform instance created by a factory.
#[inline]
pub fn record_transform_created(transform: &str) {
    counter!(TRANSFORMS_CREATED, "transform" => transform.to_string()).increment(1);
}

/// Record one calculate call.
#[inline]
pub fn record_calculation(transform: &'static str, points: usize, duration: Duration) {
    counter!(CALCULATIONS, "transform" => transform).increment(1);
    counter!(POINTS_PRODUCED, "transform" => transform).increment(points as u64);
    histogram!(CALCULATE_TIME_NS, "transform" => transform).record(duration.as_nanos() as f64);
}

/// Record a plugin module loaded into a registry.
#[inline]
pub fn record_plugin_loaded(plugin: &str) {
    counter!(PLUGINS_LOADED, "plugin" => plugin.to_string()).increment(1);
}
