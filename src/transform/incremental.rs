//! Incremental single-input transforms.
//!
//! Hosts call `calculate` repeatedly while the source keeps growing. A
//! [`PointTransform`] only describes how one source sample maps to (at most)
//! one output sample; [`apply_incremental`] takes care of feeding it the
//! samples that arrived since the previous call.

use super::{Progress, TimeSeriesTransform};
use crate::error::Result;
use crate::observability::{record_calculation, span_calculate};
use crate::series::{Point, TimeSeries};
use std::time::Instant;

/// A transform computed sample by sample.
pub trait PointTransform: TimeSeriesTransform {
    /// Output for the source sample at `index`, or `None` to emit nothing.
    ///
    /// Samples are visited in increasing `index` order, each exactly once
    /// between resets. Earlier samples may already be trimmed from the
    /// source, so anything needed from them is kept in the transform.
    fn next_point(&mut self, source: &TimeSeries, index: usize) -> Option<Point>;

    /// Drop per-sample state (running sums, previous samples).
    fn reset_points(&mut self) {}
}

/// Feed a [`PointTransform`] the source samples it has not seen yet.
///
/// Progress is a [`SeriesMark`](crate::series::SeriesMark) on the source and
/// one on `destination`, so samples appended with a repeated `x` are still
/// picked up. Starts over (clearing `destination` and calling
/// [`PointTransform::reset_points`]) when:
/// - nothing was computed yet, or the state was invalidated by a parameter
///   or source change
/// - `destination` was changed since the last pass, other than by its own
///   retention window (cleared, refilled, or a different series)
/// - the source changed other than by appending or dropping old samples:
///   an out-of-order insert, a `clear`, or unseen samples trimmed away
///
/// Returns the number of samples appended to `destination`.
pub fn apply_incremental<T>(transform: &mut T, destination: &mut TimeSeries) -> Result<usize>
where
    T: PointTransform + ?Sized,
{
    let name = transform.name();
    let source = transform.state().require_source(name)?;
    let source = source.read();

    let _span = span_calculate(name, transform.alias()).entered();
    let started = Instant::now();

    let resume_at = transform.state().progress().and_then(|last| {
        let untouched = destination.resume_index(last.destination) == Some(destination.len());
        untouched.then(|| source.resume_index(last.source)).flatten()
    });
    let restart = resume_at.is_none();

    let start = match resume_at {
        Some(index) => index,
        None => {
            destination.clear();
            transform.reset_points();
            0
        }
    };

    let mut produced = 0;
    for index in start..source.len() {
        if let Some(point) = transform.next_point(&source, index) {
            destination.push_back(point);
            produced += 1;
        }
    }

    transform.state_mut().set_progress(Some(Progress {
        source: source.mark(),
        destination: destination.mark(),
    }));

    tracing::trace!(
        transform = name,
        restart,
        produced,
        source_len = source.len(),
        "calculated"
    );
    record_calculation(name, produced, started.elapsed());

    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transform::TransformState;

    /// Emits `y + 1` and counts samples seen since the last reset.
    #[derive(Default)]
    struct PlusOne {
        state: TransformState,
        seen: usize,
        resets: usize,
    }

    impl TimeSeriesTransform for PlusOne {
        fn name(&self) -> &'static str {
            "plus_one"
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

    impl PointTransform for PlusOne {
        fn next_point(&mut self, source: &TimeSeries, index: usize) -> Option<Point> {
            self.seen += 1;
            source.at(index).map(|p| Point::new(p.x, p.y + 1.0))
        }

        fn reset_points(&mut self) {
            self.seen = 0;
            self.resets += 1;
        }
    }

    #[test]
    fn test_first_calculation_is_full() {
        let source = TimeSeries::from_points("src", [Point::new(0.0, 1.0), Point::new(1.0, 2.0)])
            .into_shared();
        let mut t = PlusOne::default();
        t.set_data_source(&source);

        let mut out = TimeSeries::new("out");
        assert_eq!(apply_incremental(&mut t, &mut out).unwrap(), 2);
        assert_eq!(out.to_vec(), vec![Point::new(0.0, 2.0), Point::new(1.0, 3.0)]);
        assert_eq!(t.resets, 1);
    }

    #[test]
    fn test_only_new_samples_are_processed() {
        let source = TimeSeries::from_points("src", [Point::new(0.0, 1.0)]).into_shared();
        let mut t = PlusOne::default();
        t.set_data_source(&source);
        let mut out = TimeSeries::new("out");
        t.calculate(&mut out).unwrap();

        source.write().push_back(Point::new(1.0, 5.0));
        source.write().push_back(Point::new(2.0, 7.0));
        assert_eq!(apply_incremental(&mut t, &mut out).unwrap(), 2);

        assert_eq!(out.len(), 3);
        assert_eq!(t.seen, 3);
        assert_eq!(t.resets, 1);
    }

    #[test]
    fn test_nothing_new() {
        let source = TimeSeries::from_points("src", [Point::new(0.0, 1.0)]).into_shared();
        let mut t = PlusOne::default();
        t.set_data_source(&source);
        let mut out = TimeSeries::new("out");
        t.calculate(&mut out).unwrap();
        assert_eq!(apply_incremental(&mut t, &mut out).unwrap(), 0);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_source_reset_restarts() {
        let source = TimeSeries::from_points("src", [Point::new(5.0, 1.0), Point::new(6.0, 1.0)])
            .into_shared();
        let mut t = PlusOne::default();
        t.set_data_source(&source);
        let mut out = TimeSeries::new("out");
        t.calculate(&mut out).unwrap();

        {
            let mut s = source.write();
            s.clear();
            s.push_back(Point::new(0.0, 10.0));
        }
        t.calculate(&mut out).unwrap();

        assert_eq!(out.to_vec(), vec![Point::new(0.0, 11.0)]);
        assert_eq!(t.resets, 2);
    }

    #[test]
    fn test_cleared_destination_restarts() {
        let source = TimeSeries::from_points("src", [Point::new(0.0, 1.0)]).into_shared();
        let mut t = PlusOne::default();
        t.set_data_source(&source);
        let mut out = TimeSeries::new("out");
        t.calculate(&mut out).unwrap();

        out.clear();
        t.calculate(&mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(t.resets, 2);
    }

    #[test]
    fn test_foreign_destination_samples_restart() {
        let source = TimeSeries::from_points("src", [Point::new(0.0, 1.0)]).into_shared();
        let mut t = PlusOne::default();
        t.set_data_source(&source);
        let mut out = TimeSeries::new("out");
        t.calculate(&mut out).unwrap();

        out.push_back(Point::new(9.0, 9.0));
        t.calculate(&mut out).unwrap();
        assert_eq!(out.to_vec(), vec![Point::new(0.0, 2.0)]);
        assert_eq!(t.resets, 2);

        let mut fresh = TimeSeries::new("fresh");
        t.calculate(&mut fresh).unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(t.resets, 3);
    }

    #[test]
    fn test_empty_output_continues() {
        let source = TimeSeries::new("src").into_shared();
        let mut t = PlusOne::default();
        t.set_data_source(&source);
        let mut out = TimeSeries::new("out");
        t.calculate(&mut out).unwrap();
        assert!(out.is_empty());

        source.write().push_back(Point::new(0.0, 1.0));
        t.calculate(&mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(t.resets, 1);
    }

    #[test]
    fn test_parameter_change_restarts() {
        let source = TimeSeries::from_points("src", [Point::new(0.0, 1.0)]).into_shared();
        let mut t = PlusOne::default();
        t.set_data_source(&source);
        let mut out = TimeSeries::new("out");
        t.calculate(&mut out).unwrap();

        t.state_mut().notify_parameters_changed();
        t.calculate(&mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(t.resets, 2);
    }

    #[test]
    fn test_repeated_x_is_picked_up() {
        let source = TimeSeries::from_points("src", [Point::new(0.0, 1.0), Point::new(1.0, 2.0)])
            .into_shared();
        let mut t = PlusOne::default();
        t.set_data_source(&source);
        let mut out = TimeSeries::new("out");
        t.calculate(&mut out).unwrap();

        source.write().push_back(Point::new(1.0, 5.0));
        assert_eq!(apply_incremental(&mut t, &mut out).unwrap(), 1);
        assert_eq!(
            out.to_vec(),
            vec![Point::new(0.0, 2.0), Point::new(1.0, 3.0), Point::new(1.0, 6.0)]
        );
        assert_eq!(t.resets, 1);
    }

    #[test]
    fn test_out_of_order_insert_restarts() {
        let source = TimeSeries::from_points("src", [Point::new(0.0, 1.0), Point::new(2.0, 1.0)])
            .into_shared();
        let mut t = PlusOne::default();
        t.set_data_source(&source);
        let mut out = TimeSeries::new("out");
        t.calculate(&mut out).unwrap();

        source.write().push_back(Point::new(1.0, 100.0));
        assert_eq!(apply_incremental(&mut t, &mut out).unwrap(), 3);
        assert_eq!(out.at(1), Some(Point::new(1.0, 101.0)));
        assert_eq!(t.resets, 2);
    }

    #[test]
    fn test_trimmed_source_continues() {
        let mut series = TimeSeries::new("src");
        series.set_maximum_range_x(Some(1.0));
        series.extend([Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        let source = series.into_shared();

        let mut t = PlusOne::default();
        t.set_data_source(&source);
        let mut out = TimeSeries::new("out");
        t.calculate(&mut out).unwrap();

        source.write().push_back(Point::new(2.0, 2.0));
        source.write().push_back(Point::new(3.0, 3.0));
        assert_eq!(source.read().len(), 2);
        assert_eq!(apply_incremental(&mut t, &mut out).unwrap(), 2);
        assert_eq!(out.len(), 4);
        assert_eq!(t.resets, 1);
    }

    #[test]
    fn test_missing_source() {
        let mut t = PlusOne::default();
        let mut out = TimeSeries::new("out");
        assert!(matches!(
            apply_incremental(&mut t, &mut out),
            Err(Error::MissingDataSource { .. })
        ));
    }

    #[test]
    fn test_empty_source_clears_destination() {
        let source = TimeSeries::new("src").into_shared();
        let mut t = PlusOne::default();
        t.set_data_source(&source);
        let mut out = TimeSeries::from_points("out", [Point::new(0.0, 0.0)]);
        assert_eq!(apply_incremental(&mut t, &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }
}
