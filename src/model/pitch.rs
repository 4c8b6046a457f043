use serde::{Deserialize, Serialize};

/// A pitch curve as `(tick, value)` pairs sorted by tick.
///
/// A `None` value marks a gap: no authored data at that tick. With
/// `is_absolute` the values are key numbers (fractional cents allowed),
/// otherwise they are semitone offsets from the governing note's key, where
/// `0.0` means "follow the note" and may be dropped on conversion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Pitch {
    pub points: Vec<(i64, Option<f64>)>,
    pub is_absolute: bool,
}

impl Pitch {
    pub fn new(points: Vec<(i64, Option<f64>)>, is_absolute: bool) -> Self {
        Self {
            points,
            is_absolute,
        }
    }

    /// Build a relative curve from defined samples only.
    pub fn relative(points: Vec<(i64, f64)>) -> Self {
        Self::new(
            points.into_iter().map(|(t, v)| (t, Some(v))).collect(),
            false,
        )
    }

    pub fn absolute(points: Vec<(i64, f64)>) -> Self {
        Self::new(
            points.into_iter().map(|(t, v)| (t, Some(v))).collect(),
            true,
        )
    }

    /// True when there is no authored value anywhere on the curve.
    pub fn is_empty(&self) -> bool {
        self.points.iter().all(|(_, v)| v.is_none())
    }

    /// Points carrying a value, gaps skipped.
    pub fn defined_points(&self) -> Vec<(i64, f64)> {
        self.points
            .iter()
            .filter_map(|&(t, v)| v.map(|v| (t, v)))
            .collect()
    }

    /// Drop points that repeat the value of the point before them. The first
    /// and last points always survive so the curve keeps its extent.
    pub fn reduced(&self) -> Self {
        let len = self.points.len();
        let mut points: Vec<(i64, Option<f64>)> = Vec::with_capacity(len);

        for (i, &(tick, value)) in self.points.iter().enumerate() {
            let is_last = i + 1 == len;
            if let Some(&(_, previous)) = points.last()
                && previous == value
                && !is_last
            {
                continue;
            }
            points.push((tick, value));
        }

        Self::new(points, self.is_absolute)
    }

    /// Points with `start <= tick < end`.
    pub fn clipped(&self, start: i64, end: i64) -> Self {
        Self::new(
            self.points
                .iter()
                .filter(|(t, _)| *t >= start && *t < end)
                .copied()
                .collect(),
            self.is_absolute,
        )
    }

    pub fn time_scaled(&self, factor: f64) -> Self {
        Self::new(
            self.points
                .iter()
                .map(|&(t, v)| (crate::time::scale_tick(t, factor), v))
                .collect(),
            self.is_absolute,
        )
    }
}
