//! Observability features: metrics and tracing.
//!
//! - **Metrics**: Counters and histograms via `metrics-rs`
//! - **Tracing**: Structured logging and spans via `tracing`
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `seriesforge_transforms_registered` | Counter | Transform types registered |
//! | `seriesforge_transforms_created` | Counter | Transform instances created |
//! | `seriesforge_calculations` | Counter | Calls to `calculate` |
//! | `seriesforge_points_produced` | Counter | Samples written to destinations |
//! | `seriesforge_calculate_time_ns` | Histogram | Time per `calculate` call |
//! | `seriesforge_plugins_loaded` | Counter | Plugin modules loaded |
//!
//! ## Tracing
//!
//! seriesforge emits spans for:
//! - Each `calculate` of a built-in transform (`DEBUG`)
//! - Each plugin load (`INFO`)
//!
//! and events for registrations, duplicate rejections and plugin loads.
//! Install any `tracing` subscriber to see them.

mod metrics;
mod tracing_support;

pub use metrics::{
    init_metrics, record_calculation, record_plugin_loaded, record_transform_created,
    record_transform_registered,
};
pub use tracing_support::{
    span_calculate, span_plugin_load, trace_plugin_loaded, trace_plugin_rejected,
};
