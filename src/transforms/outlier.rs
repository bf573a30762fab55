//! Spike removal.

use crate::error::{Error, Result};
use crate::series::{Point, TimeSeries};
use crate::series_transform;
use crate::transform::{
    PointTransform, TimeSeriesTransform, TransformKind, TransformState, apply_incremental,
};

/// Default spike factor.
pub const DEFAULT_OUTLIER_FACTOR: f64 = 100.0;

/// Threshold below which neighbours count as identical.
const MIN_BASELINE: f64 = 1e-9;

/// Removes isolated spikes.
///
/// A sample is dropped when it jumps away from its previous neighbour and
/// back towards its next one, and both jumps exceed `factor` times the
/// distance between the two neighbours.
///
/// Judging a sample needs its successor, so the newest source sample is
/// emitted only once a newer one arrives. The first sample is always kept.
#[series_transform(name = "outlier_removal", description = "Remove isolated spikes")]
#[derive(Debug)]
pub struct OutlierRemoval {
    state: TransformState,
    factor: f64,
    /// Sample preceding `pending`.
    before: Option<Point>,
    /// Newest sample, waiting for its successor.
    pending: Option<Point>,
}

impl Default for OutlierRemoval {
    fn default() -> Self {
        Self {
            state: TransformState::new(),
            factor: DEFAULT_OUTLIER_FACTOR,
            before: None,
            pending: None,
        }
    }
}

impl OutlierRemoval {
    /// Create a filter with [`DEFAULT_OUTLIER_FACTOR`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter with a custom factor.
    pub fn with_factor(factor: f64) -> Result<Self> {
        let mut filter = Self::default();
        filter.set_factor(factor)?;
        Ok(filter)
    }

    /// Spike factor.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Set the spike factor. Must be positive and finite.
    pub fn set_factor(&mut self, factor: f64) -> Result<()> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(Error::InvalidParameter {
                transform: Self::NAME,
                parameter: "factor",
                reason: format!("factor must be positive and finite, got {factor}"),
            });
        }
        if factor != self.factor {
            self.factor = factor;
            self.state.notify_parameters_changed();
        }
        Ok(())
    }

    fn is_spike(&self, before: Point, sample: Point, after: Point) -> bool {
        let rise = sample.y - before.y;
        let fall = after.y - sample.y;
        if rise * fall >= 0.0 {
            return false;
        }
        let baseline = (after.y - before.y).abs().max(MIN_BASELINE);
        rise.abs().min(fall.abs()) > self.factor * baseline
    }
}

impl TimeSeriesTransform for OutlierRemoval {
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

impl PointTransform for OutlierRemoval {
    /// Judges the sample received before the one at `index`.
    fn next_point(&mut self, source: &TimeSeries, index: usize) -> Option<Point> {
        let after = source.at(index)?;
        let sample = self.pending.replace(after)?;
        match self.before.replace(sample) {
            Some(before) => (!self.is_spike(before, sample, after)).then_some(sample),
            None => Some(sample),
        }
    }

    fn reset_points(&mut self) {
        self.before = None;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(filter: &mut OutlierRemoval, ys: &[f64]) -> Vec<f64> {
        let src = TimeSeries::from_points(
            "in",
            ys.iter().enumerate().map(|(i, y)| Point::new(i as f64, *y)),
        )
        .into_shared();
        filter.set_data_source(&src);
        let mut out = TimeSeries::new("out");
        filter.calculate(&mut out).unwrap();
        out.iter().map(|p| p.y).collect()
    }

    #[test]
    fn test_spike_removed() {
        let mut filter = OutlierRemoval::with_factor(10.0).unwrap();
        let ys = run(&mut filter, &[1.0, 1.1, 500.0, 1.2, 1.3, 1.4]);
        assert_eq!(ys, vec![1.0, 1.1, 1.2, 1.3]);
    }

    #[test]
    fn test_step_kept() {
        let mut filter = OutlierRemoval::with_factor(10.0).unwrap();
        let ys = run(&mut filter, &[0.0, 0.0, 100.0, 100.0, 100.0]);
        assert_eq!(ys, vec![0.0, 0.0, 100.0, 100.0]);
    }

    #[test]
    fn test_single_sample_withheld() {
        let mut filter = OutlierRemoval::new();
        assert!(run(&mut filter, &[1.0]).is_empty());
    }

    #[test]
    fn test_invalid_factor() {
        assert!(OutlierRemoval::with_factor(0.0).is_err());
        assert!(OutlierRemoval::with_factor(-1.0).is_err());
        assert!(OutlierRemoval::with_factor(f64::INFINITY).is_err());
    }
}
