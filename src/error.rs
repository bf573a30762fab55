//! Error types for seriesforge.

use crate::plugin::PluginError;
use thiserror::Error;

/// Result type alias using seriesforge's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for seriesforge operations.
///
/// Looking up an unknown transform name is not an error: the factory
/// returns `None` for it.
#[derive(Error, Debug)]
pub enum Error {
    /// A different transform type is already registered under this name.
    #[error("transform '{name}' is already registered by a different type")]
    DuplicateTransform {
        /// The contested transform name.
        name: String,
    },

    /// A transform's [`name`](crate::transform::TimeSeriesTransform::name)
    /// disagrees with the name it was registered under.
    #[error("transform registered as '{name}' reports its name as '{reported}'")]
    NameMismatch {
        /// Name the type declares through `TransformKind::NAME`.
        name: String,
        /// Name its instances return.
        reported: String,
    },

    /// Registration was attempted after the factory was sealed.
    #[error("cannot register '{name}': transform factory is sealed")]
    RegistrySealed {
        /// Name of the rejected transform.
        name: String,
    },

    /// `calculate` was called without a live data source.
    #[error("transform '{transform}' has no data source")]
    MissingDataSource {
        /// Name of the transform that was asked to calculate.
        transform: String,
    },

    /// A transform parameter was set to an unusable value.
    #[error("invalid parameter '{parameter}' for transform '{transform}': {reason}")]
    InvalidParameter {
        /// Name of the transform.
        transform: &'static str,
        /// Name of the parameter.
        parameter: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Plugin loading or registration failed.
    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),
}
