use crate::process::interpolation::Point;
use log::debug;

/// Epsilon increment used by [`simplify_to_count`] when the caller has no
/// better scale for its values.
pub const DEFAULT_EPSILON_STEP: f64 = 0.01;

/// Distance from `point` to the line through `start` and `end`. A zero
/// length chord falls back to the distance to `start`.
fn perpendicular_distance(point: Point, start: Point, end: Point) -> f64 {
    let (px, py) = (point.0 as f64, point.1);
    let (sx, sy) = (start.0 as f64, start.1);
    let (dx, dy) = (end.0 as f64 - sx, end.1 - sy);
    let length = dx.hypot(dy);

    if length == 0.0 {
        return (px - sx).hypot(py - sy);
    }

    let (ux, uy) = (dx / length, dy / length);
    ((px - sx) * uy - (py - sy) * ux).abs()
}

/// Ramer-Douglas-Peucker: keep the farthest point while it sits more than
/// `epsilon` off the chord, recursing on both halves.
pub fn simplify(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let last = points[points.len() - 1];

    let (index, max_distance) = points[1..points.len() - 1]
        .iter()
        .enumerate()
        .map(|(i, &point)| (i + 1, perpendicular_distance(point, first, last)))
        .fold((0, -1.0), |best, candidate| {
            if candidate.1 > best.1 { candidate } else { best }
        });

    if max_distance > epsilon {
        let mut left = simplify(&points[..=index], epsilon);
        let right = simplify(&points[index..], epsilon);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

/// Simplify with a growing epsilon (`step`, `2 * step`, ...) until fewer than
/// `max_count` points remain. Never goes below two points.
pub fn simplify_to_count(points: &[Point], max_count: usize, step: f64) -> Vec<Point> {
    let step = if step.is_finite() && step > 0.0 {
        step
    } else {
        DEFAULT_EPSILON_STEP
    };

    let mut epsilon = step;
    let mut result = simplify(points, epsilon);
    while result.len() >= max_count && result.len() > 2 {
        epsilon += step;
        result = simplify(points, epsilon);
    }

    debug!(
        "Simplified curve from {} to {} point(s) at epsilon {}..!",
        points.len(),
        result.len(),
        epsilon
    );
    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn straight_line_collapses_to_endpoints() {
        let points: Vec<Point> = (0..50).map(|i| (i * 10, i as f64 * 0.5)).collect();
        for epsilon in [1e-6, 0.01, 1.0] {
            assert_eq!(simplify(&points, epsilon), vec![(0, 0.0), (490, 24.5)]);
        }
    }

    #[test]
    fn keeps_a_corner() {
        let points = vec![(0, 0.0), (5, 5.1), (10, 10.0), (15, 4.9), (20, 0.0)];
        let simplified = simplify(&points, 1.0);
        assert_eq!(simplified, vec![(0, 0.0), (10, 10.0), (20, 0.0)]);
    }

    #[test]
    fn degenerate_chord_uses_point_distance() {
        let points = vec![(0, 0.0), (3, 4.0), (0, 0.0)];
        assert_eq!(simplify(&points, 4.9).len(), 3);
        assert_eq!(simplify(&points, 5.0).len(), 2);
    }

    #[test]
    fn count_limit_is_honoured() {
        let points: Vec<Point> = (0..200)
            .map(|i| (i * 5, (i as f64 * 0.3).sin()))
            .collect();

        let simplified = simplify_to_count(&points, 20, DEFAULT_EPSILON_STEP);
        assert!(simplified.len() < 20);
        assert!(simplified.len() >= 2);
        assert_eq!(simplified.first(), points.first());
        assert_eq!(simplified.last(), points.last());
    }

    #[test]
    fn never_below_two_points() {
        let points = vec![(0, 0.0), (1, 5.0), (2, -5.0), (3, 0.0)];
        assert_eq!(simplify_to_count(&points, 1, 0.5).len(), 2);
        assert_eq!(simplify_to_count(&points, 0, 0.0).len(), 2);
    }

    #[test]
    fn always_simplifies_once() {
        let points = vec![(0, 0.0), (1, 1.0), (2, 2.0)];
        assert_eq!(simplify_to_count(&points, 100, 0.01).len(), 2);
    }
}
