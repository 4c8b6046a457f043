//! Curve algorithms shared by every format: interpolation shapes, resampling,
//! simplification, pitch relativity and vibrato synthesis.

mod interpolation;
mod rdp;
mod relativity;
mod resample;
mod vibrato;

pub use interpolation::*;
pub use rdp::*;
pub use relativity::*;
pub use resample::*;
pub use vibrato::*;
