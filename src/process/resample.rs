use crate::process::interpolation::{CurveShape, Point};

/// Value carried forward from the closest point at or before `tick`, or the
/// closest point after it when nothing precedes.
pub fn carry_forward(_tick: i64, previous: Option<Point>, next: Option<Point>) -> f64 {
    previous.or(next).map(|(_, value)| value).unwrap_or(0.0)
}

/// Straight line between the surrounding points, holding the ends.
pub fn linear_fill(tick: i64, previous: Option<Point>, next: Option<Point>) -> f64 {
    match (previous, next) {
        (Some(start), Some(end)) if end.0 > start.0 => CurveShape::Linear.value_at(start, end, tick),
        _ => carry_forward(tick, previous, next),
    }
}

/// Regrid a sparse curve onto `min, min + step, ...` up to its last tick,
/// filling each grid tick with [`carry_forward`].
pub fn resample(points: &[Point], step: i64) -> Vec<Point> {
    resample_with(points, step, carry_forward)
}

/// Regrid with a caller-chosen fill rule. `fill` receives the grid tick, the
/// last point at or before it and the first point after it.
pub fn resample_with<F>(points: &[Point], step: i64, fill: F) -> Vec<Point>
where
    F: Fn(i64, Option<Point>, Option<Point>) -> f64,
{
    let step = step.max(1);
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|&(tick, _)| tick);

    let (Some(&(first, _)), Some(&(last, _))) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };

    // index of the first point strictly after the current grid tick
    let mut cursor = 0;
    let mut result = Vec::with_capacity(((last - first) / step + 1) as usize);
    let mut tick = first;

    while tick <= last {
        while cursor < sorted.len() && sorted[cursor].0 <= tick {
            cursor += 1;
        }
        let previous = cursor.checked_sub(1).map(|i| sorted[i]);
        let next = sorted.get(cursor).copied();

        result.push((tick, fill(tick, previous, next)));
        tick += step;
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn carries_values_forward() {
        let points = vec![(0, 1.0), (12, 2.0), (20, 3.0)];
        let result = resample(&points, 5);
        assert_eq!(result, vec![(0, 1.0), (5, 1.0), (10, 1.0), (15, 2.0), (20, 3.0)]);
    }

    #[test]
    fn unsorted_input_is_regridded() {
        let points = vec![(20, 3.0), (0, 1.0)];
        let result = resample(&points, 10);
        assert_eq!(result, vec![(0, 1.0), (10, 1.0), (20, 3.0)]);
    }

    #[test]
    fn grid_stops_before_the_last_tick_when_off_grid() {
        let result = resample(&[(0, 1.0), (7, 2.0)], 5);
        assert_eq!(result, vec![(0, 1.0), (5, 1.0)]);
    }

    #[test]
    fn custom_fill_rule() {
        let points = vec![(0, 0.0), (10, 10.0)];
        let result = resample_with(&points, 2, linear_fill);
        assert_eq!(result, vec![(0, 0.0), (2, 2.0), (4, 4.0), (6, 6.0), (8, 8.0), (10, 10.0)]);

        let result = resample_with(&points, 5, |_, previous, _| previous.map_or(-1.0, |p| p.1 * 2.0));
        assert_eq!(result, vec![(0, 0.0), (5, 0.0), (10, 20.0)]);
    }

    #[test]
    fn empty_and_single_point() {
        assert!(resample(&[], 5).is_empty());
        assert_eq!(resample(&[(42, 0.5)], 5), vec![(42, 0.5)]);
    }
}
