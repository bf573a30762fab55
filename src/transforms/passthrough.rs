//! PassThrough transform - copies samples unchanged.

use crate::error::Result;
use crate::series::{Point, TimeSeries};
use crate::series_transform;
use crate::transform::{
    PointTransform, TimeSeriesTransform, TransformKind, TransformState, apply_incremental,
};

/// A transform that copies its source unchanged.
///
/// This is useful for:
/// - Plotting a series under a different alias
/// - Testing host-side transform plumbing
///
/// # Example
///
/// ```rust
/// use seriesforge::prelude::*;
/// use seriesforge::transforms::PassThrough;
///
/// let source = TimeSeries::from_points("in", [Point::new(0.0, 1.0), Point::new(1.0, 2.0)])
///     .into_shared();
///
/// let mut passthrough = PassThrough::new();
/// passthrough.set_data_source(&source);
///
/// let mut out = TimeSeries::new("out");
/// passthrough.calculate(&mut out).unwrap();
/// assert_eq!(out.to_vec(), source.read().to_vec());
/// ```
#[series_transform(name = "passthrough", description = "Copy the source unchanged")]
#[derive(Debug, Default)]
pub struct PassThrough {
    state: TransformState,
}

impl PassThrough {
    /// Create a new PassThrough transform.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSeriesTransform for PassThrough {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn calculate(&mut self, destination: &mut TimeSeries) -> Result<()> {
        apply_incremental(self, destination).map(|_| ())
    }

    fn state(&self) -> &TransformState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut TransformState {
        &mut self.state
    }
}

impl PointTransform for PassThrough {
    fn next_point(&mut self, source: &TimeSeries, index: usize) -> Option<Point> {
        source.at(index)
    }
}
