use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// A curve sample: `(tick, value)`.
pub type Point = (i64, f64);

/// How a curve travels between two points.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum CurveShape {
    #[default]
    Linear,
    /// Half cosine through both points.
    CosineEaseInOut,
    /// Quarter cosine arriving flat at the end point.
    CosineEaseIn,
    /// Quarter cosine leaving flat from the start point.
    CosineEaseOut,
}

impl CurveShape {
    /// Value at `x` on the segment `start`-`end`. `end.0` must differ from `start.0`.
    pub fn value_at(self, start: Point, end: Point, x: i64) -> f64 {
        let (x0, y0) = start;
        let (x1, y1) = end;
        let span = (x1 - x0) as f64;
        let t = (x - x0) as f64 / span;

        match self {
            CurveShape::Linear => y0 + (x - x0) as f64 * (y1 - y0) / span,
            CurveShape::CosineEaseInOut => (y0 + y1) / 2.0 + (y0 - y1) / 2.0 * (PI * t).cos(),
            CurveShape::CosineEaseIn => y0 + (y1 - y0) * (FRAC_PI_2 * t).sin(),
            CurveShape::CosineEaseOut => y1 + (y0 - y1) * (FRAC_PI_2 * t).cos(),
        }
    }

    /// Samples strictly between `start` and `end` on the grid `start.0 + k * interval`.
    /// The endpoints themselves are left to the caller.
    pub fn between(self, start: Point, end: Point, interval: i64) -> Vec<Point> {
        let interval = interval.max(1);
        if end.0 <= start.0 {
            return Vec::new();
        }

        (1..)
            .map(|k| start.0 + k * interval)
            .take_while(|&x| x < end.0)
            .map(|x| (x, self.value_at(start, end, x)))
            .collect()
    }
}

/// Fill every segment of `points` with samples of `shape`, keeping the
/// original points.
pub fn interpolate(points: &[Point], interval: i64, shape: CurveShape) -> Vec<Point> {
    let Some(&last) = points.last() else {
        return Vec::new();
    };

    let mut result = Vec::with_capacity(points.len());
    for pair in points.windows(2) {
        result.push(pair[0]);
        result.extend(shape.between(pair[0], pair[1], interval));
    }
    result.push(last);
    result
}

/// Like [`interpolate`], with the shape chosen per segment by its start point.
pub fn interpolate_shaped(points: &[(i64, f64, CurveShape)], interval: i64) -> Vec<Point> {
    let Some(&(last_tick, last_value, _)) = points.last() else {
        return Vec::new();
    };

    let mut result = Vec::with_capacity(points.len());
    for pair in points.windows(2) {
        let (x0, y0, shape) = pair[0];
        let (x1, y1, _) = pair[1];
        result.push((x0, y0));
        result.extend(shape.between((x0, y0), (x1, y1), interval));
    }
    result.push((last_tick, last_value));
    result
}

pub fn interpolate_linear(points: &[Point], interval: i64) -> Vec<Point> {
    interpolate(points, interval, CurveShape::Linear)
}

pub fn interpolate_cosine_ease_in_out(points: &[Point], interval: i64) -> Vec<Point> {
    interpolate(points, interval, CurveShape::CosineEaseInOut)
}

pub fn interpolate_cosine_ease_in(points: &[Point], interval: i64) -> Vec<Point> {
    interpolate(points, interval, CurveShape::CosineEaseIn)
}

pub fn interpolate_cosine_ease_out(points: &[Point], interval: i64) -> Vec<Point> {
    interpolate(points, interval, CurveShape::CosineEaseOut)
}

/// Linear lookup into a sorted curve, holding the end values outside it.
pub fn value_at(points: &[Point], tick: i64) -> Option<f64> {
    let index = points.partition_point(|&(t, _)| t <= tick);
    match (index.checked_sub(1).map(|i| points[i]), points.get(index)) {
        (None, None) => None,
        (Some((_, y)), None) | (None, Some(&(_, y))) => Some(y),
        (Some(start), Some(&end)) => Some(CurveShape::Linear.value_at(start, end, tick)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn linear_grid() {
        let result = interpolate_linear(&[(0, 0.0), (10, 10.0)], 5);
        assert_eq!(result, vec![(0, 0.0), (5, 5.0), (10, 10.0)]);
    }

    #[test]
    fn ease_in_out_midpoint() {
        let result = interpolate_cosine_ease_in_out(&[(0, 0.0), (10, 10.0)], 5);
        assert_eq!(result.len(), 3);
        assert_eq!(result[1], (5, 5.0));
    }

    #[test]
    fn grid_is_relative_to_segment_start() {
        let interior = CurveShape::Linear.between((3, 0.0), (15, 12.0), 5);
        assert_eq!(interior, vec![(8, 5.0), (13, 10.0)]);

        // endpoints on the grid are excluded
        let interior = CurveShape::Linear.between((0, 0.0), (10, 1.0), 10);
        assert!(interior.is_empty());
    }

    #[test]
    fn quarter_cosines_are_flat_at_one_end() {
        let start = (0, 0.0);
        let end = (100, 1.0);

        // ease in arrives flat: the last step is tiny compared to the first
        let ease_in = |x| CurveShape::CosineEaseIn.value_at(start, end, x);
        assert!(ease_in(100) - ease_in(99) < ease_in(1) - ease_in(0));
        assert!(approx_eq(ease_in(100), 1.0));

        let ease_out = |x| CurveShape::CosineEaseOut.value_at(start, end, x);
        assert!(ease_out(1) - ease_out(0) < ease_out(100) - ease_out(99));
        assert!(approx_eq(ease_out(0), 0.0));
        assert!(approx_eq(ease_out(100), 1.0));
    }

    #[test]
    fn shapes_stay_within_endpoints() {
        for shape in [
            CurveShape::Linear,
            CurveShape::CosineEaseInOut,
            CurveShape::CosineEaseIn,
            CurveShape::CosineEaseOut,
        ] {
            let samples = shape.between((0, 2.0), (40, -1.0), 3);
            assert_eq!(samples.len(), 13);
            assert!(samples.iter().all(|&(_, y)| (-1.0..=2.0).contains(&y)));
        }
    }

    #[test]
    fn per_segment_shapes() {
        let points = vec![
            (0, 0.0, CurveShape::Linear),
            (10, 10.0, CurveShape::CosineEaseInOut),
            (20, 0.0, CurveShape::Linear),
        ];
        let result = interpolate_shaped(&points, 5);
        assert_eq!(result, vec![(0, 0.0), (5, 5.0), (10, 10.0), (15, 5.0), (20, 0.0)]);
    }

    #[test]
    fn lookup_holds_ends() {
        let points = vec![(10, 1.0), (20, 3.0)];
        assert_eq!(value_at(&points, 0), Some(1.0));
        assert_eq!(value_at(&points, 15), Some(2.0));
        assert_eq!(value_at(&points, 20), Some(3.0));
        assert_eq!(value_at(&points, 30), Some(3.0));
        assert_eq!(value_at(&[], 30), None);
    }
}
