//! Musical time: the measure/tick cursor, the tempo map transform and the
//! measure-prefix normalization every importer runs.

mod counter;
mod prefix;
mod transformer;

pub use counter::*;
pub use prefix::*;
pub use transformer::*;

pub const TICKS_IN_BEAT: i64 = 480;
pub const TICKS_IN_FULL_NOTE: i64 = TICKS_IN_BEAT * 4;

/// Scale a tick by `factor`, rounding to the nearest tick.
pub fn scale_tick(tick: i64, factor: f64) -> i64 {
    (tick as f64 * factor).round() as i64
}
