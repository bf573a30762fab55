//! Time-series containers.
//!
//! This module provides:
//! - [`Point`]: A single `(x, y)` sample, `x` being time in seconds
//! - [`TimeSeries`]: A named, x-ordered sequence of points
//! - [`SeriesRef`]: The shared handle a host uses to own a series
//! - [`SeriesHandle`]: A non-owning reference to a [`SeriesRef`]
//! - [`SeriesMark`]: A position in a series, for consumers reading it
//!   incrementally

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

/// Shared, host-owned time series.
pub type SeriesRef = Arc<RwLock<TimeSeries>>;

/// Non-owning reference to a host-owned time series.
pub type SeriesHandle = Weak<RwLock<TimeSeries>>;

/// A single sample.
///
/// # Examples
///
/// ```rust
/// use seriesforge::series::Point;
///
/// let p = Point::new(0.5, 2.0);
/// assert_eq!(p.x, 0.5);
/// assert_eq!(p.y, 2.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    /// Time, in seconds.
    pub x: f64,
    /// Value.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    #[inline]
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Closed interval of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
}

impl Range {
    /// Width of the interval.
    #[inline]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Position reached by a consumer of a [`TimeSeries`].
///
/// Obtained from [`TimeSeries::mark`] and resolved back to an index with
/// [`TimeSeries::resume_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesMark {
    revision: u64,
    position: u64,
}

/// A named sequence of points kept sorted by `x`.
///
/// Samples normally arrive in time order and are appended. A sample older
/// than the current back is inserted at its sorted position instead.
/// Samples with a NaN `x` are discarded.
///
/// When a maximum x range is set, pushing a sample drops the front samples
/// that fall outside `[back.x - range, back.x]`.
///
/// Appends and front removals keep earlier [`SeriesMark`]s valid. Any other
/// change (an out-of-order insert, [`clear`](Self::clear)) starts a new
/// revision and invalidates them.
///
/// # Examples
///
/// ```rust
/// use seriesforge::series::{Point, TimeSeries};
///
/// let mut series = TimeSeries::new("speed");
/// series.push_back(Point::new(0.0, 1.0));
/// series.push_back(Point::new(2.0, 3.0));
/// series.push_back(Point::new(1.0, 2.0));
///
/// assert_eq!(series.len(), 3);
/// assert_eq!(series.at(1), Some(Point::new(1.0, 2.0)));
/// assert_eq!(series.index_from_x(1.9), Some(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    name: String,
    points: VecDeque<Point>,
    maximum_range_x: Option<f64>,
    revision: u64,
    /// Samples ever removed from the front in the current revision.
    removed: u64,
}

impl PartialEq for TimeSeries {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.maximum_range_x == other.maximum_range_x
            && self.points == other.points
    }
}

impl TimeSeries {
    /// Create an empty series.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: VecDeque::new(),
            maximum_range_x: None,
            revision: 0,
            removed: 0,
        }
    }

    /// Create a series from points, sorting them by `x`.
    pub fn from_points(name: impl Into<String>, points: impl IntoIterator<Item = Point>) -> Self {
        let mut series = Self::new(name);
        series.extend(points);
        series
    }

    /// Wrap this series into a shared host-owned handle.
    pub fn into_shared(self) -> SeriesRef {
        Arc::new(RwLock::new(self))
    }

    /// Series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the series.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the series holds no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Remove every sample. The retention window is kept.
    pub fn clear(&mut self) {
        self.points.clear();
        self.new_revision();
    }

    /// Retention window on `x`, if any.
    pub fn maximum_range_x(&self) -> Option<f64> {
        self.maximum_range_x
    }

    /// Set the retention window on `x`. `None` keeps every sample.
    ///
    /// Non-finite or negative ranges are treated as `None`.
    pub fn set_maximum_range_x(&mut self, range: Option<f64>) {
        self.maximum_range_x = range.filter(|r| r.is_finite() && *r >= 0.0);
        self.trim_front();
    }

    /// Add a sample, keeping the series sorted by `x`.
    ///
    /// A sample with a NaN `x` cannot be ordered and is discarded.
    pub fn push_back(&mut self, point: Point) {
        if point.x.is_nan() {
            return;
        }
        match self.points.back() {
            Some(back) if point.x < back.x => {
                let at = self.points.partition_point(|p| p.x <= point.x);
                self.points.insert(at, point);
                self.new_revision();
            }
            _ => self.points.push_back(point),
        }
        self.trim_front();
    }

    /// Remove and return the oldest sample.
    pub fn pop_front(&mut self) -> Option<Point> {
        let point = self.points.pop_front()?;
        self.removed += 1;
        Some(point)
    }

    /// Current position: just past the newest sample.
    pub fn mark(&self) -> SeriesMark {
        SeriesMark {
            revision: self.revision,
            position: self.removed + self.points.len() as u64,
        }
    }

    /// Index of the first sample added after `mark` was taken.
    ///
    /// Returns `None` when the samples before `mark` can no longer be told
    /// apart from new ones: the series changed revision, or samples not yet
    /// seen at `mark` time were already dropped from the front.
    pub fn resume_index(&self, mark: SeriesMark) -> Option<usize> {
        if mark.revision != self.revision {
            return None;
        }
        let index = usize::try_from(mark.position.checked_sub(self.removed)?).ok()?;
        (index <= self.points.len()).then_some(index)
    }

    /// Oldest sample.
    #[inline]
    pub fn front(&self) -> Option<Point> {
        self.points.front().copied()
    }

    /// Newest sample.
    #[inline]
    pub fn back(&self) -> Option<Point> {
        self.points.back().copied()
    }

    /// Sample at `index`.
    #[inline]
    pub fn at(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }

    /// Iterate over samples in time order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Point> + DoubleEndedIterator + '_ {
        self.points.iter()
    }

    /// Copy the samples into a vector.
    pub fn to_vec(&self) -> Vec<Point> {
        self.points.iter().copied().collect()
    }

    /// Index of the first sample with `x` strictly greater than `x`.
    pub fn first_index_after(&self, x: f64) -> usize {
        self.points.partition_point(|p| p.x <= x)
    }

    /// Index of the sample closest to `x`.
    ///
    /// Ties resolve to the earlier sample. Returns `None` when empty.
    pub fn index_from_x(&self, x: f64) -> Option<usize> {
        if self.points.is_empty() {
            return None;
        }
        let upper = self.points.partition_point(|p| p.x < x);
        if upper == 0 {
            return Some(0);
        }
        if upper == self.points.len() {
            return Some(upper - 1);
        }
        let before = x - self.points[upper - 1].x;
        let after = self.points[upper].x - x;
        if after < before {
            Some(upper)
        } else {
            Some(upper - 1)
        }
    }

    /// Value of the sample closest to `x`.
    pub fn y_from_x(&self, x: f64) -> Option<f64> {
        self.index_from_x(x).map(|i| self.points[i].y)
    }

    /// Span of `x` covered by the samples.
    pub fn range_x(&self) -> Option<Range> {
        match (self.front(), self.back()) {
            (Some(front), Some(back)) => Some(Range {
                min: front.x,
                max: back.x,
            }),
            _ => None,
        }
    }

    /// Span of `y` covered by the samples. NaN values are ignored.
    pub fn range_y(&self) -> Option<Range> {
        self.points
            .iter()
            .map(|p| p.y)
            .filter(|y| !y.is_nan())
            .fold(None, |acc: Option<Range>, y| match acc {
                None => Some(Range { min: y, max: y }),
                Some(r) => Some(Range {
                    min: r.min.min(y),
                    max: r.max.max(y),
                }),
            })
    }

    fn trim_front(&mut self) {
        let (Some(range), Some(back)) = (self.maximum_range_x, self.points.back().copied()) else {
            return;
        };
        let oldest = back.x - range;
        while self.points.front().is_some_and(|p| p.x < oldest) {
            self.pop_front();
        }
    }

    fn new_revision(&mut self) {
        self.revision += 1;
        self.removed = 0;
    }
}

impl Extend<Point> for TimeSeries {
    fn extend<I: IntoIterator<Item = Point>>(&mut self, iter: I) {
        for point in iter {
            self.push_back(point);
        }
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a Point;
    type IntoIter = std::collections::vec_deque::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
