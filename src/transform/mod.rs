//! The time-series transform contract.
//!
//! A transform derives one time series from another according to a
//! parameterized rule. Every transform:
//!
//! - reads from a host-owned data source it never owns nor mutates
//! - writes into a destination series supplied at each [`calculate`] call
//! - carries a user-facing alias
//! - emits [`ParametersChanged`] when a tunable parameter changes
//!
//! The common state lives in [`TransformState`]; concrete transforms embed
//! one and expose it through [`TimeSeriesTransform::state`] and
//! [`TimeSeriesTransform::state_mut`], which gives them every provided
//! method of the trait for free.
//!
//! # Example
//!
//! ```rust
//! use seriesforge::prelude::*;
//!
//! #[derive(Default)]
//! struct Negate {
//!     state: TransformState,
//! }
//!
//! impl TimeSeriesTransform for Negate {
//!     fn name(&self) -> &'static str {
//!         "negate"
//!     }
//!
//!     fn calculate(&mut self, destination: &mut TimeSeries) -> Result<()> {
//!         let source = self.state.require_source(self.name())?;
//!         destination.clear();
//!         destination.extend(source.read().iter().map(|p| Point::new(p.x, -p.y)));
//!         Ok(())
//!     }
//!
//!     fn state(&self) -> &TransformState {
//!         &self.state
//!     }
//!
//!     fn state_mut(&mut self) -> &mut TransformState {
//!         &mut self.state
//!     }
//! }
//!
//! let source = TimeSeries::from_points("in", [Point::new(0.0, 1.0)]).into_shared();
//! let mut negate = Negate::default();
//! negate.set_data_source(&source);
//!
//! let mut out = TimeSeries::new("out");
//! negate.calculate(&mut out).unwrap();
//! assert_eq!(out.at(0), Some(Point::new(0.0, -1.0)));
//! ```
//!
//! [`calculate`]: TimeSeriesTransform::calculate

mod incremental;
mod signal;

pub use incremental::{PointTransform, apply_incremental};
pub use signal::{ConnectionId, ParametersChanged, ParametersObserver};

use crate::error::{Error, Result};
use crate::series::{SeriesHandle, SeriesMark, SeriesRef, TimeSeries};
use std::sync::Arc;

/// Versioned contract identifier plugin modules must declare.
pub const TRANSFORM_CONTRACT_ID: &str = "seriesforge.TimeSeriesTransform/1";

/// Owned transform instance handed out by the factory.
pub type TransformPtr = Box<dyn TimeSeriesTransform>;

/// State shared by every transform.
#[derive(Debug, Default)]
pub struct TransformState {
    source: Option<SeriesHandle>,
    alias: String,
    parameters_changed: ParametersChanged,
    /// Where the last incremental pass stopped; `None` forces a full
    /// recomputation.
    progress: Option<Progress>,
}

/// Source and destination marks taken at the end of an incremental pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Progress {
    pub(crate) source: SeriesMark,
    pub(crate) destination: SeriesMark,
}

impl TransformState {
    /// Create an empty state: no source, empty alias, no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point at a host-owned source. The state keeps only a weak reference.
    ///
    /// Invalidates any incremental progress.
    pub fn set_source(&mut self, source: &SeriesRef) {
        self.source = Some(Arc::downgrade(source));
        self.invalidate();
    }

    /// Forget the configured source.
    pub fn clear_source(&mut self) {
        self.source = None;
        self.invalidate();
    }

    /// The configured source, if it was set and its owner still holds it.
    pub fn source(&self) -> Option<SeriesRef> {
        self.source.as_ref().and_then(|weak| weak.upgrade())
    }

    /// Check if a live source is configured.
    pub fn has_source(&self) -> bool {
        self.source.as_ref().is_some_and(|weak| weak.strong_count() > 0)
    }

    /// The configured source, or [`Error::MissingDataSource`].
    pub fn require_source(&self, transform: &str) -> Result<SeriesRef> {
        self.source().ok_or_else(|| Error::MissingDataSource {
            transform: transform.to_string(),
        })
    }

    /// User-facing label.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Set the user-facing label.
    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = alias.into();
    }

    /// The parameters-changed signal.
    pub fn parameters_changed(&self) -> &ParametersChanged {
        &self.parameters_changed
    }

    /// The parameters-changed signal, for attaching observers.
    pub fn parameters_changed_mut(&mut self) -> &mut ParametersChanged {
        &mut self.parameters_changed
    }

    /// Record a parameter change: drop incremental progress and notify
    /// observers.
    pub fn notify_parameters_changed(&mut self) {
        self.invalidate();
        self.parameters_changed.emit();
    }

    /// Force the next incremental calculation to start from scratch.
    pub fn invalidate(&mut self) {
        self.progress = None;
    }

    pub(crate) fn progress(&self) -> Option<Progress> {
        self.progress
    }

    pub(crate) fn set_progress(&mut self, progress: Option<Progress>) {
        self.progress = progress;
    }
}

/// The capability every transform implements.
///
/// Only [`name`](Self::name), [`calculate`](Self::calculate) and the state
/// accessors are required.
pub trait TimeSeriesTransform: Send {
    /// Stable identifier, identical for every instance of a type.
    fn name(&self) -> &'static str;

    /// Populate `destination` from the data source.
    ///
    /// Fails with [`Error::MissingDataSource`] when no live source is
    /// configured, leaving `destination` untouched. Never mutates the source.
    fn calculate(&mut self, destination: &mut TimeSeries) -> Result<()>;

    /// Common state.
    fn state(&self) -> &TransformState;

    /// Common state, mutably.
    fn state_mut(&mut self) -> &mut TransformState;

    /// Drop any internal progress so the next calculation starts over.
    fn reset(&mut self) {
        self.state_mut().invalidate();
    }

    /// Point at a host-owned source. Later calls replace the reference.
    fn set_data_source(&mut self, source: &SeriesRef) {
        self.state_mut().set_source(source);
    }

    /// The configured source, or `None` if never set or already dropped.
    fn data_source(&self) -> Option<SeriesRef> {
        self.state().source()
    }

    /// Check the precondition of [`calculate`](Self::calculate).
    fn has_data_source(&self) -> bool {
        self.state().has_source()
    }

    /// User-facing label. Empty by default.
    fn alias(&self) -> &str {
        self.state().alias()
    }

    /// Set the user-facing label.
    fn set_alias(&mut self, alias: &str) {
        self.state_mut().set_alias(alias);
    }

    /// Signal emitted when a tunable parameter changes.
    fn parameters_changed(&mut self) -> &mut ParametersChanged {
        self.state_mut().parameters_changed_mut()
    }
}

/// A transform type the factory can register.
///
/// The identifier is a compile-time constant, so lookups never need an
/// instance. Usually implemented with
/// [`#[series_transform]`](crate::series_transform).
///
/// [`TransformFactory::register`](crate::factory::TransformFactory::register)
/// builds one default instance and rejects the type with
/// [`Error::NameMismatch`] if its `name()` differs from `NAME`.
pub trait TransformKind: TimeSeriesTransform + Default + 'static {
    /// Stable identifier; must equal [`TimeSeriesTransform::name`].
    const NAME: &'static str;

    /// Human-readable description shown by hosts.
    const DESCRIPTION: &'static str;
}
