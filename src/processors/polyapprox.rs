//! Polyline approximation for baselines.
//!
//! - [`poly_approx`] fits a polyline with a fixed number of straight segments
//!   whose vertices are a subset of the input points, minimizing the summed
//!   error of the skipped points (dynamic programming over breakpoints).
//!   It returns `num_segments + 1` points.
//! - [`norm_trace`] resamples a point sequence to a fixed number of points
//!   evenly spaced along its arc length. It returns `num_points` points.

use ndarray::Array2;

use super::geometry::Point;

/// Error of a point against the segment `start -> end`.
pub type ErrorFn = fn(&Point, &Point, &Point) -> f32;

/// Vertical distance between `point` and the line through `start` and `end`,
/// measured at `point.x`.
pub fn one_axis_delta(point: &Point, start: &Point, end: &Point) -> f32 {
    let dx = end.x - start.x;
    if dx.abs() < f32::EPSILON {
        return (point.y - start.y).abs();
    }
    let y = start.y + (point.x - start.x) * (end.y - start.y) / dx;
    (point.y - y).abs()
}

/// Picks `count` points at evenly spaced indices `floor(i * (n - 1) / (count - 1))`.
///
/// Indices repeat when the input has fewer than `count` points.
pub fn subsample_evenly(points: &[Point], count: usize) -> Vec<Point> {
    if points.is_empty() || count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![points[0]];
    }
    let last = (points.len() - 1) as f64;
    let steps = (count - 1) as f64;
    (0..count)
        .map(|i| points[(i as f64 * last / steps) as usize])
        .collect()
}

/// Optimal polyline approximation with `num_segments` segments.
///
/// Returns the total error and the `num_segments + 1` selected points, first and
/// last input points included. Inputs with at most `num_segments` points are
/// returned unchanged with zero error.
pub fn poly_approx(points: &[Point], num_segments: usize, error: ErrorFn) -> (f32, Vec<Point>) {
    let n = points.len();
    let k = num_segments.max(1);
    if n <= k {
        return (0.0, points.to_vec());
    }

    // cost[[a, b]]: error of the points strictly between a and b against a->b
    let mut cost = Array2::<f32>::zeros((n, n));
    for a in 0..n {
        for b in (a + 2)..n {
            cost[[a, b]] = ((a + 1)..b)
                .map(|j| error(&points[j], &points[a], &points[b]))
                .sum();
        }
    }

    // best[[s, b]]: minimal error of s segments covering points[0..=b]
    let mut best = Array2::<f32>::from_elem((k + 1, n), f32::INFINITY);
    let mut parent = Array2::<usize>::zeros((k + 1, n));
    best[[0, 0]] = 0.0;
    for s in 1..=k {
        for b in s..n {
            for a in (s - 1)..b {
                let prev = best[[s - 1, a]];
                if !prev.is_finite() {
                    continue;
                }
                let candidate = prev + cost[[a, b]];
                if candidate < best[[s, b]] {
                    best[[s, b]] = candidate;
                    parent[[s, b]] = a;
                }
            }
        }
    }

    let mut indices = vec![n - 1];
    let mut b = n - 1;
    for s in (1..=k).rev() {
        b = parent[[s, b]];
        indices.push(b);
    }
    indices.reverse();

    (
        best[[k, n - 1]],
        indices.into_iter().map(|i| points[i]).collect(),
    )
}

/// Resamples the trace to `num_points` points evenly spaced by arc length.
pub fn norm_trace(points: &[Point], num_points: usize) -> Vec<Point> {
    if points.is_empty() || num_points == 0 {
        return Vec::new();
    }

    let mut cumulative = Vec::with_capacity(points.len());
    cumulative.push(0.0f32);
    for pair in points.windows(2) {
        let dx = pair[1].x - pair[0].x;
        let dy = pair[1].y - pair[0].y;
        let last = cumulative[cumulative.len() - 1];
        cumulative.push(last + (dx * dx + dy * dy).sqrt());
    }
    let total = cumulative[cumulative.len() - 1];
    if total <= f32::EPSILON || num_points == 1 {
        return vec![points[0]; num_points];
    }

    let mut out = Vec::with_capacity(num_points);
    let mut seg = 0;
    for i in 0..num_points {
        let target = total * i as f32 / (num_points - 1) as f32;
        while seg + 2 < points.len() && cumulative[seg + 1] < target {
            seg += 1;
        }
        let span = cumulative[seg + 1] - cumulative[seg];
        let t = if span > f32::EPSILON {
            ((target - cumulative[seg]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let (a, b) = (points[seg], points[seg + 1]);
        out.push(Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y)));
    }
    out
}
