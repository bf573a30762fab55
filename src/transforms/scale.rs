//! Affine transforms on sample values.

use crate::error::{Error, Result};
use crate::series::{Point, TimeSeries};
use crate::series_transform;
use crate::transform::{
    PointTransform, TimeSeriesTransform, TransformKind, TransformState, apply_incremental,
};

/// Scales and offsets samples: `x' = x + time_offset`, `y' = y * scale + offset`.
///
/// # Example
///
/// ```rust
/// use seriesforge::prelude::*;
/// use seriesforge::transforms::Scale;
///
/// let source = TimeSeries::from_points("celsius", [Point::new(0.0, 100.0)]).into_shared();
///
/// let mut to_fahrenheit = Scale::new().with_scale(1.8).unwrap().with_offset(32.0).unwrap();
/// to_fahrenheit.set_data_source(&source);
///
/// let mut out = TimeSeries::new("fahrenheit");
/// to_fahrenheit.calculate(&mut out).unwrap();
/// assert_eq!(out.at(0), Some(Point::new(0.0, 212.0)));
/// ```
#[series_transform(name = "scale", description = "Scale and offset values, shift time")]
#[derive(Debug)]
pub struct Scale {
    state: TransformState,
    scale: f64,
    offset: f64,
    time_offset: f64,
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            state: TransformState::new(),
            scale: 1.0,
            offset: 0.0,
            time_offset: 0.0,
        }
    }
}

impl Scale {
    /// Create an identity scale (`scale = 1`, no offsets).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_scale`](Self::set_scale).
    pub fn with_scale(mut self, scale: f64) -> Result<Self> {
        self.set_scale(scale)?;
        Ok(self)
    }

    /// Builder form of [`set_offset`](Self::set_offset).
    pub fn with_offset(mut self, offset: f64) -> Result<Self> {
        self.set_offset(offset)?;
        Ok(self)
    }

    /// Builder form of [`set_time_offset`](Self::set_time_offset).
    pub fn with_time_offset(mut self, time_offset: f64) -> Result<Self> {
        self.set_time_offset(time_offset)?;
        Ok(self)
    }

    /// Multiplier applied to values.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Offset added to scaled values.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Offset added to time.
    pub fn time_offset(&self) -> f64 {
        self.time_offset
    }

    /// Set the value multiplier. Must be finite.
    pub fn set_scale(&mut self, scale: f64) -> Result<()> {
        let scale = finite("scale", scale)?;
        if scale != self.scale {
            self.scale = scale;
            self.state.notify_parameters_changed();
        }
        Ok(())
    }

    /// Set the value offset. Must be finite.
    pub fn set_offset(&mut self, offset: f64) -> Result<()> {
        let offset = finite("offset", offset)?;
        if offset != self.offset {
            self.offset = offset;
            self.state.notify_parameters_changed();
        }
        Ok(())
    }

    /// Set the time offset. Must be finite.
    pub fn set_time_offset(&mut self, time_offset: f64) -> Result<()> {
        let time_offset = finite("time_offset", time_offset)?;
        if time_offset != self.time_offset {
            self.time_offset = time_offset;
            self.state.notify_parameters_changed();
        }
        Ok(())
    }
}

fn finite(parameter: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidParameter {
            transform: Scale::NAME,
            parameter,
            reason: format!("{value} is not finite"),
        })
    }
}

impl TimeSeriesTransform for Scale {
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

impl PointTransform for Scale {
    fn next_point(&mut self, source: &TimeSeries, index: usize) -> Option<Point> {
        let p = source.at(index)?;
        Some(Point::new(
            p.x + self.time_offset,
            p.y * self.scale + self.offset,
        ))
    }
}

/// Absolute value of samples.
#[series_transform(name = "absolute", description = "Absolute value")]
#[derive(Debug, Default)]
pub struct Absolute {
    state: TransformState,
}

impl Absolute {
    /// Create a new absolute-value transform.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSeriesTransform for Absolute {
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

impl PointTransform for Absolute {
    fn next_point(&mut self, source: &TimeSeries, index: usize) -> Option<Point> {
        source.at(index).map(|p| Point::new(p.x, p.y.abs()))
    }
}
