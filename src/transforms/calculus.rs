//! Derivative and integral transforms.

use crate::error::{Error, Result};
use crate::series::{Point, TimeSeries};
use crate::series_transform;
use crate::transform::{
    PointTransform, TimeSeriesTransform, TransformKind, TransformState, apply_incremental,
};

/// Time step used between consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TimeStep {
    /// Use the actual distance between sample timestamps.
    #[default]
    Actual,
    /// Use a fixed step, in seconds, regardless of timestamps.
    Fixed(f64),
}

impl TimeStep {
    fn between(&self, prev: Point, next: Point) -> f64 {
        match *self {
            Self::Actual => next.x - prev.x,
            Self::Fixed(dt) => dt,
        }
    }

    fn validate(self, transform: &'static str) -> Result<Self> {
        match self {
            Self::Fixed(dt) if !(dt.is_finite() && dt > 0.0) => Err(Error::InvalidParameter {
                transform,
                parameter: "time_step",
                reason: format!("fixed step must be positive and finite, got {dt}"),
            }),
            step => Ok(step),
        }
    }
}

/// First derivative: `(y[i] - y[i-1]) / dt`, placed at `x[i-1]`.
///
/// Pairs with a non-positive time step are skipped.
///
/// # Example
///
/// ```rust
/// use seriesforge::prelude::*;
/// use seriesforge::transforms::Derivative;
///
/// let source = TimeSeries::from_points(
///     "position",
///     [Point::new(0.0, 0.0), Point::new(1.0, 2.0), Point::new(2.0, 6.0)],
/// )
/// .into_shared();
///
/// let mut speed = Derivative::new();
/// speed.set_data_source(&source);
///
/// let mut out = TimeSeries::new("speed");
/// speed.calculate(&mut out).unwrap();
/// assert_eq!(out.to_vec(), vec![Point::new(0.0, 2.0), Point::new(1.0, 4.0)]);
/// ```
#[series_transform(name = "derivative", description = "First derivative")]
#[derive(Debug, Default)]
pub struct Derivative {
    state: TransformState,
    time_step: TimeStep,
    prev: Option<Point>,
}

impl Derivative {
    /// Create a derivative using actual timestamps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_time_step`](Self::set_time_step).
    pub fn with_time_step(mut self, time_step: TimeStep) -> Result<Self> {
        self.set_time_step(time_step)?;
        Ok(self)
    }

    /// Current time step policy.
    pub fn time_step(&self) -> TimeStep {
        self.time_step
    }

    /// Set the time step policy. A fixed step must be positive.
    pub fn set_time_step(&mut self, time_step: TimeStep) -> Result<()> {
        let time_step = time_step.validate(Self::NAME)?;
        if time_step != self.time_step {
            self.time_step = time_step;
            self.state.notify_parameters_changed();
        }
        Ok(())
    }
}

impl TimeSeriesTransform for Derivative {
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

impl PointTransform for Derivative {
    fn next_point(&mut self, source: &TimeSeries, index: usize) -> Option<Point> {
        let next = source.at(index)?;
        let prev = self.prev.replace(next)?;
        let dt = self.time_step.between(prev, next);
        if dt <= 0.0 {
            return None;
        }
        Some(Point::new(prev.x, (next.y - prev.y) / dt))
    }

    fn reset_points(&mut self) {
        self.prev = None;
    }
}

/// Cumulative trapezoidal integral, starting at zero on the first sample.
#[series_transform(name = "integral", description = "Cumulative integral")]
#[derive(Debug, Default)]
pub struct Integral {
    state: TransformState,
    time_step: TimeStep,
    accumulated: f64,
    prev: Option<Point>,
}

impl Integral {
    /// Create an integral using actual timestamps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_time_step`](Self::set_time_step).
    pub fn with_time_step(mut self, time_step: TimeStep) -> Result<Self> {
        self.set_time_step(time_step)?;
        Ok(self)
    }

    /// Current time step policy.
    pub fn time_step(&self) -> TimeStep {
        self.time_step
    }

    /// Set the time step policy. A fixed step must be positive.
    pub fn set_time_step(&mut self, time_step: TimeStep) -> Result<()> {
        let time_step = time_step.validate(Self::NAME)?;
        if time_step != self.time_step {
            self.time_step = time_step;
            self.state.notify_parameters_changed();
        }
        Ok(())
    }
}

impl TimeSeriesTransform for Integral {
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

    fn reset(&mut self) {
        self.reset_points();
        self.state.invalidate();
    }
}

impl PointTransform for Integral {
    fn next_point(&mut self, source: &TimeSeries, index: usize) -> Option<Point> {
        let next = source.at(index)?;
        if let Some(prev) = self.prev {
            let dt = self.time_step.between(prev, next);
            self.accumulated += (prev.y + next.y) * 0.5 * dt;
        }
        self.prev = Some(next);
        Some(Point::new(next.x, self.accumulated))
    }

    fn reset_points(&mut self) {
        self.accumulated = 0.0;
        self.prev = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> crate::series::SeriesRef {
        TimeSeries::from_points(
            "ramp",
            [
                Point::new(0.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(2.0, 2.0),
                Point::new(4.0, 4.0),
            ],
        )
        .into_shared()
    }

    #[test]
    fn test_derivative_of_ramp() {
        let src = ramp();
        let mut d = Derivative::new();
        d.set_data_source(&src);

        let mut out = TimeSeries::new("out");
        d.calculate(&mut out).unwrap();
        let xs: Vec<f64> = out.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = out.iter().map(|p| p.y).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
        assert_eq!(ys, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_derivative_spans_trimmed_sample() {
        let src = TimeSeries::from_points("in", [Point::new(0.0, 0.0)]).into_shared();
        src.write().set_maximum_range_x(Some(0.5));
        let mut d = Derivative::new();
        d.set_data_source(&src);

        let mut out = TimeSeries::new("out");
        d.calculate(&mut out).unwrap();
        src.write().push_back(Point::new(1.0, 3.0));
        assert_eq!(src.read().len(), 1);

        d.calculate(&mut out).unwrap();
        assert_eq!(out.to_vec(), vec![Point::new(0.0, 3.0)]);
    }

    #[test]
    fn test_derivative_fixed_step() {
        let src = ramp();
        let mut d = Derivative::new().with_time_step(TimeStep::Fixed(0.5)).unwrap();
        d.set_data_source(&src);

        let mut out = TimeSeries::new("out");
        d.calculate(&mut out).unwrap();
        assert_eq!(out.back().unwrap().y, 4.0);
    }

    #[test]
    fn test_derivative_skips_duplicate_timestamps() {
        let src = TimeSeries::from_points(
            "dup",
            [Point::new(0.0, 0.0), Point::new(0.0, 5.0), Point::new(1.0, 6.0)],
        )
        .into_shared();
        let mut d = Derivative::new();
        d.set_data_source(&src);

        let mut out = TimeSeries::new("out");
        d.calculate(&mut out).unwrap();
        assert_eq!(out.to_vec(), vec![Point::new(0.0, 1.0)]);
    }

    #[test]
    fn test_derivative_incremental_matches_full() {
        let src = TimeSeries::from_points("grow", [Point::new(0.0, 0.0), Point::new(1.0, 1.0)])
            .into_shared();
        let mut d = Derivative::new();
        d.set_data_source(&src);
        let mut out = TimeSeries::new("out");
        d.calculate(&mut out).unwrap();

        src.write().push_back(Point::new(2.0, 3.0));
        d.calculate(&mut out).unwrap();
        assert_eq!(out.to_vec(), vec![Point::new(0.0, 1.0), Point::new(1.0, 2.0)]);
    }

    #[test]
    fn test_invalid_fixed_step() {
        assert!(Derivative::new().with_time_step(TimeStep::Fixed(0.0)).is_err());
        assert!(Integral::new().with_time_step(TimeStep::Fixed(f64::NAN)).is_err());
    }

    #[test]
    fn test_integral_of_ramp() {
        let src = ramp();
        let mut i = Integral::new();
        i.set_data_source(&src);

        let mut out = TimeSeries::new("out");
        i.calculate(&mut out).unwrap();
        let ys: Vec<f64> = out.iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![0.0, 0.5, 2.0, 8.0]);
    }

    #[test]
    fn test_integral_incremental_keeps_accumulator() {
        let src = TimeSeries::from_points("const", [Point::new(0.0, 2.0), Point::new(1.0, 2.0)])
            .into_shared();
        let mut i = Integral::new();
        i.set_data_source(&src);
        let mut out = TimeSeries::new("out");
        i.calculate(&mut out).unwrap();

        src.write().push_back(Point::new(2.0, 2.0));
        i.calculate(&mut out).unwrap();
        assert_eq!(out.back(), Some(Point::new(2.0, 4.0)));
    }

    #[test]
    fn test_integral_recalculation_starts_from_zero() {
        let src = ramp();
        let mut i = Integral::new();
        i.set_data_source(&src);
        let mut out = TimeSeries::new("out");
        i.calculate(&mut out).unwrap();

        i.reset();
        i.calculate(&mut out).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out.back().unwrap().y, 8.0);
    }
}
