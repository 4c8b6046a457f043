use crate::adapter::{PitchAdapter, relative_samples};
use crate::error::Result;
use crate::model::pitch::Pitch;
use crate::model::project::{Note, Tempo};
use crate::process::{
    CurveShape, DEFAULT_EPSILON_STEP, Point, VIBRATO_SAMPLING_INTERVAL_TICK, VibratoParams, append_vibratos,
    interpolate_shaped, note_borders, resample, simplify_to_count,
};
use crate::time::TickTimeTransformer;
use log::debug;
use serde::{Deserialize, Serialize};

/// Native values are tenths of a semitone.
pub const SHAPED_VALUE_UNITS_PER_SEMITONE: f64 = 10.0;
pub const KEY_POINT_MIN_TICK_SPACING: i64 = 5;
pub const SHAPED_SAMPLING_INTERVAL_TICK: i64 = 5;
pub const MAX_SHAPED_POINTS_PER_NOTE: usize = 50;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShapedPoint {
    /// Milliseconds from the owning note's start. May be negative.
    pub offset: f64,
    /// Offset from the owning note's key, in tenths of a semitone.
    pub value: f64,
    /// Shape of the segment leaving this point.
    #[serde(default)]
    pub shape: CurveShape,
}

impl ShapedPoint {
    pub fn new(offset: f64, value: f64, shape: CurveShape) -> Self {
        Self { offset, value, shape }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NoteCurve {
    pub points: Vec<ShapedPoint>,
    /// Vibrato with `depth` in cents.
    #[serde(default)]
    pub vibrato: Option<VibratoParams>,
}

/// One shaped curve per note plus a free-running curve of
/// `(tick, tenths of a semitone)` for the stretches no note curve covers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShapedPitchData {
    pub notes: Vec<NoteCurve>,
    #[serde(default)]
    pub global: Vec<(i64, f64)>,
}

/// Pitch as per-note shaped key points.
#[derive(Debug, Clone, Copy)]
pub struct ShapedPoints {
    pub max_points_per_note: usize,
    pub epsilon_step: f64,
}

impl Default for ShapedPoints {
    fn default() -> Self {
        Self {
            max_points_per_note: MAX_SHAPED_POINTS_PER_NOTE,
            epsilon_step: DEFAULT_EPSILON_STEP,
        }
    }
}

/// Key points of `curve` on the tick axis, in semitones. Each key point sits
/// at least [`KEY_POINT_MIN_TICK_SPACING`] after the one before it.
fn key_points(note: &Note, curve: &NoteCurve, transformer: &TickTimeTransformer) -> Vec<(i64, f64, CurveShape)> {
    let start = transformer.tick_to_milli_sec(note.tick_on);
    let mut previous: Option<i64> = None;

    curve
        .points
        .iter()
        .map(|point| {
            let mut tick = transformer.milli_sec_to_tick(start + point.offset);
            if let Some(previous) = previous {
                tick = tick.max(previous + KEY_POINT_MIN_TICK_SPACING);
            }
            previous = Some(tick);
            (tick, point.value / SHAPED_VALUE_UNITS_PER_SEMITONE, point.shape)
        })
        .collect()
}

impl PitchAdapter for ShapedPoints {
    type Native = ShapedPitchData;

    fn encode(&self, pitch: &Pitch, notes: &[Note], tempos: &[Tempo]) -> Result<ShapedPitchData> {
        let samples = relative_samples(pitch, notes, 0)?;
        let borders = note_borders(notes)?;
        let transformer = TickTimeTransformer::new(tempos);

        let curves = notes
            .iter()
            .enumerate()
            .map(|(index, note)| {
                let from = index.checked_sub(1).map(|i| borders[i]);
                let to = borders.get(index).copied();
                let region: Vec<Point> = samples
                    .iter()
                    .filter(|&&(tick, _)| from.is_none_or(|from| tick >= from) && to.is_none_or(|to| tick < to))
                    .map(|&(tick, value)| (tick, value * SHAPED_VALUE_UNITS_PER_SEMITONE))
                    .collect();
                if region.is_empty() {
                    return NoteCurve::default();
                }

                let start = transformer.tick_to_milli_sec(note.tick_on);
                let points = simplify_to_count(&region, self.max_points_per_note, self.epsilon_step)
                    .into_iter()
                    .map(|(tick, value)| {
                        ShapedPoint::new(transformer.tick_to_milli_sec(tick) - start, value, CurveShape::Linear)
                    })
                    .collect();

                NoteCurve { points, vibrato: None }
            })
            .collect();

        let global = resample(&samples, SHAPED_SAMPLING_INTERVAL_TICK)
            .into_iter()
            .map(|(tick, value)| (tick, value * SHAPED_VALUE_UNITS_PER_SEMITONE))
            .collect();

        Ok(ShapedPitchData { notes: curves, global })
    }

    fn decode(&self, native: &ShapedPitchData, notes: &[Note], tempos: &[Tempo]) -> Result<Option<Pitch>> {
        if notes.is_empty() {
            return Ok(None);
        }
        let transformer = TickTimeTransformer::new(tempos);

        let keys: Vec<Vec<(i64, f64, CurveShape)>> = notes
            .iter()
            .zip(&native.notes)
            .map(|(note, curve)| key_points(note, curve, &transformer))
            .collect();

        // Each note's curve runs until the next curve starts. Values go
        // absolute here so rebasing onto the governing note is a plain
        // relative conversion afterwards.
        let mut stitched: Vec<Point> = Vec::new();
        let mut covered: Vec<(i64, i64)> = Vec::new();
        for (index, note_keys) in keys.iter().enumerate() {
            let next_start = keys[index + 1..].iter().find_map(|k| k.first().map(|&(tick, _, _)| tick));
            let key = notes[index].key as f64;

            let samples: Vec<Point> = interpolate_shaped(note_keys, SHAPED_SAMPLING_INTERVAL_TICK)
                .into_iter()
                .filter(|&(tick, _)| next_start.is_none_or(|next| tick < next))
                .map(|(tick, value)| (tick, value + key))
                .collect();

            if let (Some(first), Some(last)) = (samples.first(), samples.last()) {
                covered.push((first.0, last.0));
            }
            stitched.extend(samples);
        }

        let mut points = Pitch::absolute(stitched).to_relative(notes, 0)?.defined_points();
        let uncovered = native
            .global
            .iter()
            .filter(|&&(tick, _)| !covered.iter().any(|&(from, to)| tick >= from && tick <= to))
            .map(|&(tick, value)| (tick, value / SHAPED_VALUE_UNITS_PER_SEMITONE));
        points.extend(uncovered);
        points.sort_by_key(|&(tick, _)| tick);

        let vibratos: Vec<Option<VibratoParams>> = native
            .notes
            .iter()
            .map(|curve| {
                curve.vibrato.map(|params| VibratoParams {
                    depth: params.depth / 100.0,
                    ..params
                })
            })
            .collect();
        let points = append_vibratos(
            &points,
            notes,
            &vibratos,
            &transformer,
            VIBRATO_SAMPLING_INTERVAL_TICK,
            |_| 1.0,
        );

        if points.is_empty() {
            return Ok(None);
        }
        debug!("Decoded {} shaped pitch sample(s)..!", points.len());
        Ok(Some(Pitch::relative(points)))
    }
}
