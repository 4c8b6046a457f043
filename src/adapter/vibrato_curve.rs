use crate::adapter::{MIN_BREAK_LENGTH_BETWEEN_PITCH_SECTIONS, PitchAdapter, relative_samples};
use crate::error::Result;
use crate::model::pitch::Pitch;
use crate::model::project::{Note, Tempo};
use crate::process::{Point, VIBRATO_SAMPLING_INTERVAL_TICK, VibratoParams, append_vibratos, value_at};
use crate::time::TickTimeTransformer;
use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

pub const CENTS_PER_SEMITONE: f64 = 100.0;

pub const DEFAULT_VIBRATO_START_SEC: f64 = 0.25;
pub const DEFAULT_VIBRATO_LEFT_SEC: f64 = 0.2;
pub const DEFAULT_VIBRATO_RIGHT_SEC: f64 = 0.2;
pub const DEFAULT_VIBRATO_DEPTH: f64 = 1.0;
pub const DEFAULT_VIBRATO_FREQUENCY: f64 = 5.5;
pub const DEFAULT_VIBRATO_PHASE: f64 = 0.0;
pub const DEFAULT_VIBRATO_ENVELOPE: f64 = 1.0;

/// Notes shorter than this only get vibrato when something asks for it
/// explicitly, per note or project wide.
pub const DEFAULT_VIBRATO_MIN_NOTE_LENGTH: i64 = MIN_BREAK_LENGTH_BETWEEN_PITCH_SECTIONS;

/// Vibrato settings as stored by the format. Unset fields fall back to the
/// project-wide block, then to the built-in defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VibratoSettings {
    /// Seconds from the note start.
    #[serde(default)]
    pub start: Option<f64>,
    /// Fade-in seconds.
    #[serde(default)]
    pub left: Option<f64>,
    /// Fade-out seconds.
    #[serde(default)]
    pub right: Option<f64>,
    /// Semitones.
    #[serde(default)]
    pub depth: Option<f64>,
    /// Hertz.
    #[serde(default)]
    pub frequency: Option<f64>,
    /// Radians.
    #[serde(default)]
    pub phase: Option<f64>,
}

impl VibratoSettings {
    pub fn is_unset(&self) -> bool {
        *self == Self::default()
    }

    /// Fields of `self`, filled from `fallback` where unset.
    pub fn or(self, fallback: &VibratoSettings) -> VibratoSettings {
        VibratoSettings {
            start: self.start.or(fallback.start),
            left: self.left.or(fallback.left),
            right: self.right.or(fallback.right),
            depth: self.depth.or(fallback.depth),
            frequency: self.frequency.or(fallback.frequency),
            phase: self.phase.or(fallback.phase),
        }
    }

    /// Generic parameters for a note lasting `note_length` milliseconds.
    /// `None` when the vibrato would start after the note ends.
    pub fn to_params(&self, note_length: f64) -> Option<VibratoParams> {
        let start = self.start.unwrap_or(DEFAULT_VIBRATO_START_SEC) * 1000.0;
        let span = note_length - start;
        if span <= 0.0 || !span.is_finite() {
            return None;
        }

        let left = self.left.unwrap_or(DEFAULT_VIBRATO_LEFT_SEC) * 1000.0;
        let right = self.right.unwrap_or(DEFAULT_VIBRATO_RIGHT_SEC) * 1000.0;
        let frequency = self.frequency.unwrap_or(DEFAULT_VIBRATO_FREQUENCY);

        Some(VibratoParams {
            length: span / note_length * 100.0,
            period: 1000.0 / frequency,
            depth: self.depth.unwrap_or(DEFAULT_VIBRATO_DEPTH),
            fade_in: (left / span * 100.0).clamp(0.0, 100.0),
            fade_out: (right / span * 100.0).clamp(0.0, 100.0),
            phase_shift: -self.phase.unwrap_or(DEFAULT_VIBRATO_PHASE) / TAU * 100.0,
            amplitude_shift: 0.0,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VibratoCurveData {
    /// `(tick, cents)` offsets from the governing note.
    pub pitch_delta: Vec<(i64, f64)>,
    /// `(tick, multiplier)` applied to every vibrato.
    #[serde(default)]
    pub vibrato_envelope: Vec<(i64, f64)>,
    /// Indexed like the notes. Missing entries count as unset.
    #[serde(default)]
    pub note_vibratos: Vec<VibratoSettings>,
    #[serde(default)]
    pub default_vibrato: Option<VibratoSettings>,
}

/// Pitch as a free delta curve plus a default vibrato on every note.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultVibratoCurve;

fn sorted(points: &[(i64, f64)]) -> Vec<Point> {
    let mut points = points.to_vec();
    points.sort_by_key(|&(tick, _)| tick);
    points
}

impl PitchAdapter for DefaultVibratoCurve {
    type Native = VibratoCurveData;

    /// The curve already carries any vibrato, so every note gets its own
    /// vibrato zeroed when there is a curve.
    fn encode(&self, pitch: &Pitch, notes: &[Note], _tempos: &[Tempo]) -> Result<VibratoCurveData> {
        let samples = relative_samples(pitch, notes, 0)?;
        let settings = if samples.is_empty() {
            VibratoSettings::default()
        } else {
            VibratoSettings {
                depth: Some(0.0),
                ..VibratoSettings::default()
            }
        };

        Ok(VibratoCurveData {
            pitch_delta: samples
                .into_iter()
                .map(|(tick, value)| (tick, value * CENTS_PER_SEMITONE))
                .collect(),
            vibrato_envelope: Vec::new(),
            note_vibratos: vec![settings; notes.len()],
            default_vibrato: None,
        })
    }

    fn decode(&self, native: &VibratoCurveData, notes: &[Note], tempos: &[Tempo]) -> Result<Option<Pitch>> {
        let transformer = TickTimeTransformer::new(tempos);
        let base: Vec<Point> = sorted(&native.pitch_delta)
            .into_iter()
            .map(|(tick, cents)| (tick, cents / CENTS_PER_SEMITONE))
            .collect();

        let fallback = native.default_vibrato.unwrap_or_default();
        let vibratos: Vec<Option<VibratoParams>> = notes
            .iter()
            .enumerate()
            .map(|(index, note)| {
                let own = native.note_vibratos.get(index).copied().unwrap_or_default();
                if own.is_unset() && native.default_vibrato.is_none() && note.length() < DEFAULT_VIBRATO_MIN_NOTE_LENGTH
                {
                    return None;
                }
                let length = transformer.tick_to_milli_sec(note.tick_off) - transformer.tick_to_milli_sec(note.tick_on);
                own.or(&fallback).to_params(length)
            })
            .collect();

        let envelope = sorted(&native.vibrato_envelope);
        let amplitude = |tick: i64| value_at(&envelope, tick).unwrap_or(DEFAULT_VIBRATO_ENVELOPE);
        let points = append_vibratos(
            &base,
            notes,
            &vibratos,
            &transformer,
            VIBRATO_SAMPLING_INTERVAL_TICK,
            amplitude,
        );

        if points.is_empty() {
            return Ok(None);
        }
        debug!(
            "Decoded {} delta sample(s) into {} pitch sample(s)..!",
            base.len(),
            points.len()
        );
        Ok(Some(Pitch::relative(points)))
    }
}
