use crate::adapter::{PitchAdapter, relative_samples};
use crate::error::Result;
use crate::model::pitch::Pitch;
use crate::model::project::{Note, Tempo};
use crate::process::{Point, interpolate_linear};
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PITCH_BEND_SENSITIVITY: i32 = 2;
pub const PITCH_BEND_MAX_VALUE: i32 = 8191;
pub const PITCH_BEND_MIN_VALUE: i32 = -8192;
pub const MIN_BREAK_LENGTH_BETWEEN_PITCH_SECTIONS: i64 = 480;
pub const BEND_SAMPLING_INTERVAL_TICK: i64 = 5;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BendEvent {
    pub tick: i64,
    pub value: i32,
}

impl BendEvent {
    pub fn new(tick: i64, value: i32) -> Self {
        Self { tick, value }
    }
}

/// Pitch bend samples plus the bend sensitivity (in semitones) that scales
/// them from the event on.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BendData {
    pub bends: Vec<BendEvent>,
    pub sensitivities: Vec<BendEvent>,
}

impl BendData {
    pub fn is_empty(&self) -> bool {
        self.bends.is_empty()
    }
}

/// Pitch as bend samples scaled by a sectioned bend sensitivity.
#[derive(Debug, Clone, Copy)]
pub struct SectionedBend {
    /// Forwarded to [`Pitch::to_relative`].
    pub border_append_radius: i64,
}

impl Default for SectionedBend {
    fn default() -> Self {
        Self {
            border_append_radius: 0,
        }
    }
}

/// Split wherever two consecutive samples are further apart than the
/// minimum break length.
fn split_sections(points: Vec<Point>) -> Vec<Vec<Point>> {
    let mut sections: Vec<Vec<Point>> = Vec::new();
    for point in points {
        match sections.last_mut() {
            Some(section)
                if section
                    .last()
                    .is_some_and(|last| point.0 - last.0 <= MIN_BREAK_LENGTH_BETWEEN_PITCH_SECTIONS) =>
            {
                section.push(point)
            }
            _ => sections.push(vec![point]),
        }
    }
    sections
}

fn quantize(value: f64, sensitivity: i32) -> i32 {
    let scaled = (value * PITCH_BEND_MAX_VALUE as f64 / sensitivity as f64).round();
    scaled.clamp(PITCH_BEND_MIN_VALUE as f64, PITCH_BEND_MAX_VALUE as f64) as i32
}

impl PitchAdapter for SectionedBend {
    type Native = BendData;

    fn encode(&self, pitch: &Pitch, notes: &[Note], _tempos: &[Tempo]) -> Result<BendData> {
        let samples = relative_samples(pitch, notes, self.border_append_radius)?;
        let mut data = BendData::default();

        for section in split_sections(samples) {
            let (Some(&(first_tick, _)), Some(&(last_tick, _))) = (section.first(), section.last()) else {
                continue;
            };

            let max_abs = section.iter().map(|(_, v)| v.abs()).fold(0.0, f64::max);
            let sensitivity = (max_abs.ceil() as i32).max(DEFAULT_PITCH_BEND_SENSITIVITY);
            if sensitivity > DEFAULT_PITCH_BEND_SENSITIVITY {
                debug!(
                    "Raising bend sensitivity to {} for the section at ticks {}..{}..!",
                    sensitivity, first_tick, last_tick
                );
            }

            data.sensitivities.push(BendEvent::new(first_tick, sensitivity));
            data.sensitivities.push(BendEvent::new(
                last_tick + MIN_BREAK_LENGTH_BETWEEN_PITCH_SECTIONS,
                DEFAULT_PITCH_BEND_SENSITIVITY,
            ));

            // Repeated values are skipped within a section only.
            let section_start = data.bends.len();
            for (tick, value) in interpolate_linear(&section, BEND_SAMPLING_INTERVAL_TICK) {
                let value = quantize(value, sensitivity);
                if data.bends.len() > section_start && data.bends.last().is_some_and(|last| last.value == value) {
                    continue;
                }
                data.bends.push(BendEvent::new(tick, value));
            }
        }

        Ok(data)
    }

    fn decode(&self, native: &BendData, _notes: &[Note], _tempos: &[Tempo]) -> Result<Option<Pitch>> {
        if native.is_empty() {
            return Ok(None);
        }

        let mut sensitivities = native.sensitivities.clone();
        sensitivities.sort_by_key(|event| event.tick);
        let mut bends = native.bends.clone();
        bends.sort_by_key(|event| event.tick);

        let mut cursor = 0;
        let mut sensitivity = DEFAULT_PITCH_BEND_SENSITIVITY;
        let points = bends
            .into_iter()
            .map(|bend| {
                while cursor < sensitivities.len() && sensitivities[cursor].tick <= bend.tick {
                    sensitivity = sensitivities[cursor].value;
                    cursor += 1;
                }
                let value = bend.value as f64 * sensitivity as f64 / PITCH_BEND_MAX_VALUE as f64;
                (bend.tick, value)
            })
            .collect();

        Ok(Some(Pitch::relative(points)))
    }
}
