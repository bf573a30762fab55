//! # seriesforge
//!
//! A plugin contract for time-series transforms and the registry that
//! discovers them.
//!
//! A transform derives a destination time series from a source series
//! owned by the host. Transform types are registered by name with a
//! [`TransformFactory`](factory::TransformFactory), either directly or
//! through plugin modules, and the host creates fresh instances by name
//! when the user picks one.
//!
//! ## Features
//!
//! - **Transform contract**: [`TimeSeriesTransform`](transform::TimeSeriesTransform)
//!   with shared state, aliasing and a parameters-changed notification
//! - **Incremental calculation**: per-point transforms only process new samples
//! - **Name-indexed factory**: duplicate detection and an explicit sealed phase
//! - **Plugins**: versioned C ABI, static or dynamically loaded modules
//!
//! ## Quick Start
//!
//! ```rust
//! use seriesforge::prelude::*;
//! use seriesforge::transforms::register_builtin_transforms;
//!
//! let factory = TransformFactory::new();
//! register_builtin_transforms(&factory).unwrap();
//! factory.seal();
//!
//! let source = TimeSeries::from_points(
//!     "speed",
//!     [Point::new(0.0, 1.0), Point::new(1.0, 3.0), Point::new(2.0, 6.0)],
//! )
//! .into_shared();
//!
//! let mut derivative = factory.create("derivative").unwrap();
//! derivative.set_data_source(&source);
//! derivative.set_alias("acceleration");
//!
//! let mut out = TimeSeries::new("acceleration");
//! derivative.calculate(&mut out).unwrap();
//! assert_eq!(out.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate self as seriesforge;

pub mod config;
pub mod error;
pub mod factory;
pub mod observability;
pub mod plugin;
pub mod series;
pub mod transform;
pub mod transforms;

pub use seriesforge_macros::series_transform;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::factory::TransformFactory;
    pub use crate::series::{Point, SeriesRef, TimeSeries};
    pub use crate::transform::{
        PointTransform, TimeSeriesTransform, TransformKind, TransformPtr, TransformState,
        apply_incremental,
    };
}

pub use error::{Error, Result};
