//! Translations between the canonical [`Pitch`] and the pitch representations
//! used by the three families of project formats.

mod bend;
mod shaped;
mod vibrato_curve;

pub use bend::*;
pub use shaped::*;
pub use vibrato_curve::*;

use crate::error::Result;
use crate::model::pitch::Pitch;
use crate::model::project::{Note, Tempo};

/// A pair of pure conversions for one format family. `notes` must be
/// validated; `tempos` follow the project's tempo list invariant.
pub trait PitchAdapter {
    type Native;

    fn encode(&self, pitch: &Pitch, notes: &[Note], tempos: &[Tempo]) -> Result<Self::Native>;

    /// `None` when the native data carries no pitch at all.
    fn decode(&self, native: &Self::Native, notes: &[Note], tempos: &[Tempo]) -> Result<Option<Pitch>>;
}

/// Samples of a relative curve sorted by tick, gaps read as "follow the note".
fn relative_samples(pitch: &Pitch, notes: &[Note], border_append_radius: i64) -> Result<Vec<(i64, f64)>> {
    let relative = pitch.to_relative(notes, border_append_radius)?;
    let mut samples: Vec<(i64, f64)> = relative
        .points
        .into_iter()
        .map(|(tick, value)| (tick, value.unwrap_or(0.0)))
        .collect();
    samples.sort_by_key(|&(tick, _)| tick);
    Ok(samples)
}
