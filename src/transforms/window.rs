//! Sliding-window statistics: moving average and moving RMS.

use crate::error::{Error, Result};
use crate::series::{Point, TimeSeries};
use crate::series_transform;
use crate::transform::{
    PointTransform, TimeSeriesTransform, TransformKind, TransformState, apply_incremental,
};
use std::collections::VecDeque;

/// Default number of samples in a window.
pub const DEFAULT_WINDOW: usize = 10;

/// Largest accepted window.
pub const MAX_WINDOW: usize = 1 << 20;

/// Running sum over the last `capacity` values.
#[derive(Debug, Clone)]
struct SlidingWindow {
    values: VecDeque<f64>,
    capacity: usize,
    sum: f64,
}

impl SlidingWindow {
    fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
        }
    }

    fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;
        let mut evicted = false;
        while self.values.len() > self.capacity {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
                evicted = true;
            }
        }
        // a NaN or infinity poisons the running sum even after it leaves
        if evicted && !self.sum.is_finite() {
            self.sum = self.values.iter().sum();
        }
    }

    fn mean(&self) -> Option<f64> {
        (!self.values.is_empty()).then(|| self.sum / self.values.len() as f64)
    }

    fn clear(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }

    fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.clear();
    }
}

fn validate_window(transform: &'static str, window: usize) -> Result<usize> {
    if window == 0 || window > MAX_WINDOW {
        return Err(Error::InvalidParameter {
            transform,
            parameter: "window",
            reason: format!("window must be in 1..={MAX_WINDOW}, got {window}"),
        });
    }
    Ok(window)
}

/// Mean of the last `window` samples.
///
/// The first `window - 1` outputs average over the samples available so far.
///
/// # Example
///
/// ```rust
/// use seriesforge::prelude::*;
/// use seriesforge::transforms::MovingAverage;
///
/// let source = TimeSeries::from_points(
///     "noisy",
///     [Point::new(0.0, 1.0), Point::new(1.0, 3.0), Point::new(2.0, 5.0)],
/// )
/// .into_shared();
///
/// let mut smooth = MovingAverage::with_window(2).unwrap();
/// smooth.set_data_source(&source);
///
/// let mut out = TimeSeries::new("smooth");
/// smooth.calculate(&mut out).unwrap();
/// let ys: Vec<f64> = out.iter().map(|p| p.y).collect();
/// assert_eq!(ys, vec![1.0, 2.0, 4.0]);
/// ```
#[series_transform(name = "moving_average", description = "Moving average over N samples")]
#[derive(Debug)]
pub struct MovingAverage {
    state: TransformState,
    window: SlidingWindow,
}

impl Default for MovingAverage {
    fn default() -> Self {
        Self {
            state: TransformState::new(),
            window: SlidingWindow::new(DEFAULT_WINDOW),
        }
    }
}

impl MovingAverage {
    /// Create a moving average over [`DEFAULT_WINDOW`] samples.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a moving average over `window` samples.
    pub fn with_window(window: usize) -> Result<Self> {
        let mut average = Self::default();
        average.set_window(window)?;
        Ok(average)
    }

    /// Number of samples averaged.
    pub fn window(&self) -> usize {
        self.window.capacity
    }

    /// Set the number of samples averaged.
    pub fn set_window(&mut self, window: usize) -> Result<()> {
        let window = validate_window(Self::NAME, window)?;
        if window != self.window.capacity {
            self.window.set_capacity(window);
            self.state.notify_parameters_changed();
        }
        Ok(())
    }
}

impl TimeSeriesTransform for MovingAverage {
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

impl PointTransform for MovingAverage {
    fn next_point(&mut self, source: &TimeSeries, index: usize) -> Option<Point> {
        let p = source.at(index)?;
        self.window.push(p.y);
        self.window.mean().map(|y| Point::new(p.x, y))
    }

    fn reset_points(&mut self) {
        self.window.clear();
    }
}

/// Root mean square of the last `window` samples.
#[series_transform(name = "moving_rms", description = "Moving root mean square over N samples")]
#[derive(Debug)]
pub struct MovingRms {
    state: TransformState,
    squares: SlidingWindow,
}

impl Default for MovingRms {
    fn default() -> Self {
        Self {
            state: TransformState::new(),
            squares: SlidingWindow::new(DEFAULT_WINDOW),
        }
    }
}

impl MovingRms {
    /// Create a moving RMS over [`DEFAULT_WINDOW`] samples.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a moving RMS over `window` samples.
    pub fn with_window(window: usize) -> Result<Self> {
        let mut rms = Self::default();
        rms.set_window(window)?;
        Ok(rms)
    }

    /// Number of samples in the window.
    pub fn window(&self) -> usize {
        self.squares.capacity
    }

    /// Set the number of samples in the window.
    pub fn set_window(&mut self, window: usize) -> Result<()> {
        let window = validate_window(Self::NAME, window)?;
        if window != self.squares.capacity {
            self.squares.set_capacity(window);
            self.state.notify_parameters_changed();
        }
        Ok(())
    }
}

impl TimeSeriesTransform for MovingRms {
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

impl PointTransform for MovingRms {
    fn next_point(&mut self, source: &TimeSeries, index: usize) -> Option<Point> {
        let p = source.at(index)?;
        self.squares.push(p.y * p.y);
        // running sums can drift slightly negative
        self.squares
            .mean()
            .map(|mean_square| Point::new(p.x, mean_square.max(0.0).sqrt()))
    }

    fn reset_points(&mut self) {
        self.squares.clear();
    }
}
