//! Absolute/relative pitch conversion.
//!
//! Every tick is governed by exactly one note. Between two adjacent notes the
//! border is the tick they share; across a rest it is the middle of the rest,
//! rounded down. Ticks before the first border belong to the first note and
//! ticks past the last border to the last note.

use crate::error::{ConvertError, Result};
use crate::model::pitch::Pitch;
use crate::model::project::Note;
use log::debug;

/// Borders between consecutive notes. Fails when the notes overlap or are
/// out of order.
pub fn note_borders(notes: &[Note]) -> Result<Vec<i64>> {
    notes
        .windows(2)
        .enumerate()
        .map(|(index, pair)| {
            let (current, next) = (&pair[0], &pair[1]);
            if current.tick_off > next.tick_on {
                return Err(ConvertError::NotesOverlapping {
                    index,
                    tick_off: current.tick_off,
                    next_tick_on: next.tick_on,
                });
            }

            if current.tick_off == next.tick_on {
                Ok(current.tick_off)
            } else {
                Ok((current.tick_off + next.tick_on).div_euclid(2))
            }
        })
        .collect()
}

/// Forward-only cursor handing out the governing note for ascending ticks.
pub struct GoverningNotes<'a> {
    notes: &'a [Note],
    borders: Vec<i64>,
    index: usize,
}

impl<'a> GoverningNotes<'a> {
    /// `None` when there are no notes at all.
    pub fn new(notes: &'a [Note]) -> Result<Option<Self>> {
        if notes.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            notes,
            borders: note_borders(notes)?,
            index: 0,
        }))
    }

    /// Governing note for `tick`. Ticks must not decrease between calls.
    pub fn at(&mut self, tick: i64) -> &'a Note {
        while self.index < self.borders.len() && tick >= self.borders[self.index] {
            self.index += 1;
        }
        &self.notes[self.index]
    }
}

fn sorted_points(pitch: &Pitch) -> Vec<(i64, Option<f64>)> {
    let mut points = pitch.points.clone();
    points.sort_by_key(|&(tick, _)| tick);
    points
}

impl Pitch {
    /// Offsets from the governing note's key. With `border_append_radius > 0`,
    /// every note change closer than the radius gets the post-change value
    /// copied back to `next.tick_on - radius`, so linear consumers do not draw
    /// a slope across the key change.
    pub fn to_relative(&self, notes: &[Note], border_append_radius: i64) -> Result<Pitch> {
        if !self.is_absolute {
            return Ok(self.clone());
        }
        let Some(mut governing) = GoverningNotes::new(notes)? else {
            debug!("No notes to govern the pitch curve, dropping it..!");
            return Ok(Pitch::new(Vec::new(), false));
        };

        let mut points: Vec<(i64, Option<f64>)> = sorted_points(self)
            .into_iter()
            .map(|(tick, value)| {
                let key = governing.at(tick).key as f64;
                (tick, value.map(|v| v - key))
            })
            .collect();

        if border_append_radius > 0 {
            append_points_at_borders(&mut points, notes, border_append_radius);
        }

        Ok(Pitch::new(points, false))
    }

    /// Key numbers from offsets. A `0.0` offset means "follow the note" and
    /// becomes a gap.
    pub fn to_absolute(&self, notes: &[Note]) -> Result<Pitch> {
        if self.is_absolute {
            return Ok(self.clone());
        }
        let Some(mut governing) = GoverningNotes::new(notes)? else {
            debug!("No notes to govern the pitch curve, dropping it..!");
            return Ok(Pitch::new(Vec::new(), true));
        };

        let points = sorted_points(self)
            .into_iter()
            .map(|(tick, value)| {
                let key = governing.at(tick).key as f64;
                let absolute = value.filter(|&v| v != 0.0).map(|v| v + key);
                (tick, absolute)
            })
            .collect();

        Ok(Pitch::new(points, true))
    }
}

fn append_points_at_borders(points: &mut Vec<(i64, Option<f64>)>, notes: &[Note], radius: i64) {
    for pair in notes.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        if next.tick_on - current.tick_off > radius {
            continue;
        }

        let after = points.partition_point(|&(tick, _)| tick < next.tick_on);
        let Some(&(_, value)) = points.get(after) else {
            continue;
        };

        let inserted_tick = next.tick_on - radius;
        let from = points.partition_point(|&(tick, _)| tick < inserted_tick);
        points.splice(from..after, [(inserted_tick, value)]);
    }
}
