use crate::model::project::Note;
use crate::process::interpolation::{Point, value_at};
use crate::time::TickTimeTransformer;
use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Tick spacing of synthesized vibrato samples.
pub const VIBRATO_SAMPLING_INTERVAL_TICK: i64 = 5;

/// Parametric sine vibrato attached to the tail of a note.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VibratoParams {
    /// Percent of the note covered by vibrato, counted back from its end.
    pub length: f64,
    /// Milliseconds per cycle.
    pub period: f64,
    /// Peak amplitude in semitones.
    pub depth: f64,
    /// Percent of the vibrato span spent fading in.
    pub fade_in: f64,
    /// Percent of the vibrato span spent fading out.
    pub fade_out: f64,
    /// Percent of a period the wave is shifted by.
    pub phase_shift: f64,
    /// Percent of `depth` added as a constant offset.
    pub amplitude_shift: f64,
}

impl Default for VibratoParams {
    fn default() -> Self {
        Self {
            length: 0.0,
            period: 175.0,
            depth: 0.0,
            fade_in: 0.0,
            fade_out: 0.0,
            phase_shift: 0.0,
            amplitude_shift: 0.0,
        }
    }
}

impl VibratoParams {
    /// Parameters that would produce nothing, or nothing finite.
    pub fn is_degenerate(&self) -> bool {
        let frequency = 1.0 / self.period;
        self.depth == 0.0
            || !self.depth.is_finite()
            || self.length <= 0.0
            || !frequency.is_finite()
            || frequency <= 0.0
    }

    /// Offset at `t` milliseconds into a vibrato span of `span` milliseconds.
    pub fn value_in_span(&self, t: f64, span: f64) -> f64 {
        let fade_in = ramp(t, span * self.fade_in / 100.0);
        let fade_out = ramp(span - t, span * self.fade_out / 100.0);
        let phase = TAU * self.phase_shift / 100.0;

        self.depth * fade_in * fade_out * (TAU * t / self.period - phase).sin()
            + self.depth * self.amplitude_shift / 100.0
    }
}

/// 0 -> 1 over `length`, clamped outside. A zero-length ramp is always 1.
fn ramp(position: f64, length: f64) -> f64 {
    if length <= 0.0 {
        return 1.0;
    }
    (position / length).clamp(0.0, 1.0)
}

/// Add the vibrato of `note` onto `points`, sampling every `interval` ticks
/// across the vibrato span. Existing values are kept underneath (linearly
/// interpolated between points); `amplitude` scales the vibrato per tick.
pub fn append_vibrato<A>(
    points: &[Point],
    note: &Note,
    params: &VibratoParams,
    transformer: &TickTimeTransformer,
    interval: i64,
    amplitude: A,
) -> Vec<Point>
where
    A: Fn(i64) -> f64,
{
    if params.is_degenerate() {
        return points.to_vec();
    }

    let note_start = transformer.tick_to_milli_sec(note.tick_on);
    let note_end = transformer.tick_to_milli_sec(note.tick_off);
    let vibrato_start = note_start + (note_end - note_start) * (1.0 - params.length.min(100.0) / 100.0);
    let span = note_end - vibrato_start;
    if span <= 0.0 || !span.is_finite() {
        return points.to_vec();
    }

    let start_tick = transformer.milli_sec_to_tick(vibrato_start).max(note.tick_on);
    let end_tick = note.tick_off;

    let mut sampled: Vec<Point> = Vec::new();
    let mut tick = start_tick;
    while tick < end_tick {
        let t = transformer.tick_to_milli_sec(tick) - vibrato_start;
        let offset = params.value_in_span(t.max(0.0), span) * amplitude(tick);
        let base = value_at(points, tick).unwrap_or(0.0);

        if offset.is_finite() {
            sampled.push((tick, base + offset));
        } else {
            sampled.push((tick, base));
        }
        tick += interval.max(1);
    }

    debug!(
        "Appended {} vibrato sample(s) to note {} between ticks {} and {}..!",
        sampled.len(),
        note.id,
        start_tick,
        end_tick
    );

    let before = points.iter().copied().filter(|&(t, _)| t < start_tick);
    let after = points.iter().copied().filter(|&(t, _)| t >= end_tick);
    before.chain(sampled).chain(after).collect()
}

/// [`append_vibrato`] for every note that has parameters, in note order.
pub fn append_vibratos<A>(
    points: &[Point],
    notes: &[Note],
    params: &[Option<VibratoParams>],
    transformer: &TickTimeTransformer,
    interval: i64,
    amplitude: A,
) -> Vec<Point>
where
    A: Fn(i64) -> f64,
{
    notes
        .iter()
        .zip(params)
        .filter_map(|(note, params)| params.as_ref().map(|p| (note, p)))
        .fold(points.to_vec(), |acc, (note, params)| {
            append_vibrato(&acc, note, params, transformer, interval, &amplitude)
        })
}
