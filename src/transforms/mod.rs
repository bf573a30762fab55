//! Built-in transforms.
//!
//! ## Identity
//! - [`PassThrough`]: Copy the source unchanged
//!
//! ## Value mapping
//! - [`Scale`]: Scale, offset and time shift
//! - [`Absolute`]: Absolute value
//!
//! ## Calculus
//! - [`Derivative`]: First derivative
//! - [`Integral`]: Cumulative trapezoidal integral
//!
//! ## Smoothing
//! - [`MovingAverage`]: Mean over the last N samples
//! - [`MovingRms`]: Root mean square over the last N samples
//! - [`OutlierRemoval`]: Drop isolated spikes

mod calculus;
mod outlier;
mod passthrough;
mod scale;
mod window;

pub use calculus::{Derivative, Integral, TimeStep};
pub use outlier::{DEFAULT_OUTLIER_FACTOR, OutlierRemoval};
pub use passthrough::PassThrough;
pub use scale::{Absolute, Scale};
pub use window::{DEFAULT_WINDOW, MAX_WINDOW, MovingAverage, MovingRms};

use crate::error::Result;
use crate::factory::TransformFactory;

/// Register every built-in transform with `factory`.
///
/// Returns the number of transforms registered.
pub fn register_builtin_transforms(factory: &TransformFactory) -> Result<usize> {
    factory.register::<PassThrough>()?;
    factory.register::<Scale>()?;
    factory.register::<Absolute>()?;
    factory.register::<Derivative>()?;
    factory.register::<Integral>()?;
    factory.register::<MovingAverage>()?;
    factory.register::<MovingRms>()?;
    factory.register::<OutlierRemoval>()?;
    Ok(8)
}
