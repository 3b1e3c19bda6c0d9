//! Geometric utilities for layout vectorization.
//!
//! This module provides the point and polygon primitives used to describe
//! regions, text lines and baselines, together with the polygon queries the
//! vectorizer relies on: area, perimeter, convexity, convex hull and
//! Douglas-Peucker simplification.

use imageproc::contours::Contour;
use imageproc::point::Point as ImageProcPoint;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Creates a point from an imageproc point with integer coordinates.
    pub fn from_imageproc_point(p: ImageProcPoint<i32>) -> Self {
        Self {
            x: p.x as f32,
            y: p.y as f32,
        }
    }

    /// Converts this point to an imageproc point, rounding to the nearest pixel.
    pub fn to_imageproc_point(&self) -> ImageProcPoint<i32> {
        ImageProcPoint::new(self.x.round() as i32, self.y.round() as i32)
    }
}

/// A closed polygon given by its ordered boundary vertices.
///
/// The closing edge from the last vertex back to the first is implicit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// The boundary vertices, in traversal order.
    pub points: Vec<Point>,
}

impl Polygon {
    /// Creates a new polygon from a vector of points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates an axis-aligned rectangle.
    pub fn from_coords(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let points = vec![
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x2, y2),
            Point::new(x1, y2),
        ];
        Self { points }
    }

    /// Creates a polygon from a contour traced by imageproc.
    pub fn from_contour(contour: &Contour<i32>) -> Self {
        let points = contour
            .points
            .iter()
            .map(|p| Point::from_imageproc_point(*p))
            .collect();
        Self { points }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the vertices as imageproc points, rounded to pixels.
    pub fn to_imageproc_points(&self) -> Vec<ImageProcPoint<i32>> {
        self.points.iter().map(Point::to_imageproc_point).collect()
    }

    /// Returns a new polygon translated by `(dx, dy)`.
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(
            self.points
                .iter()
                .map(|p| Point::new(p.x + dx, p.y + dy))
                .collect(),
        )
    }

    /// Returns a new polygon with every coordinate multiplied by its axis factor
    /// and truncated toward zero to a whole pixel.
    pub fn rescale(&self, sx: f32, sy: f32) -> Self {
        Self::new(
            self.points
                .iter()
                .map(|p| Point::new((p.x * sx).trunc(), (p.y * sy).trunc()))
                .collect(),
        )
    }

    /// Calculates the enclosed area using the shoelace formula.
    ///
    /// Returns 0.0 if the polygon has fewer than 3 points.
    pub fn area(&self) -> f32 {
        if self.points.len() < 3 {
            return 0.0;
        }

        let mut area = 0.0;
        let n = self.points.len();
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area.abs() / 2.0
    }

    /// Calculates the perimeter, including the closing edge.
    pub fn perimeter(&self) -> f32 {
        let mut perimeter = 0.0;
        let n = self.points.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let dx = self.points[j].x - self.points[i].x;
            let dy = self.points[j].y - self.points[i].y;
            perimeter += (dx * dx + dy * dy).sqrt();
        }
        perimeter
    }

    /// Gets the minimum x-coordinate, or 0.0 if there are no points.
    pub fn x_min(&self) -> f32 {
        self.x_range().0
    }

    /// Gets the maximum x-coordinate, or 0.0 if there are no points.
    pub fn x_max(&self) -> f32 {
        self.x_range().1
    }

    /// Gets the minimum y-coordinate, or 0.0 if there are no points.
    pub fn y_min(&self) -> f32 {
        self.y_range().0
    }

    /// Gets the maximum y-coordinate, or 0.0 if there are no points.
    pub fn y_max(&self) -> f32 {
        self.y_range().1
    }

    fn x_range(&self) -> (f32, f32) {
        self.points
            .iter()
            .map(|p| p.x)
            .minmax_by(|a, b| a.total_cmp(b))
            .into_option()
            .unwrap_or((0.0, 0.0))
    }

    fn y_range(&self) -> (f32, f32) {
        self.points
            .iter()
            .map(|p| p.y)
            .minmax_by(|a, b| a.total_cmp(b))
            .into_option()
            .unwrap_or((0.0, 0.0))
    }

    /// Tests whether the polygon is convex.
    ///
    /// Collinear vertices are allowed; every non-degenerate turn must go the same
    /// way. Polygons with fewer than 3 vertices are not convex.
    pub fn is_convex(&self) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }

        let mut direction = 0.0f32;
        for i in 0..n {
            let cross = Self::cross_product(
                &self.points[i],
                &self.points[(i + 1) % n],
                &self.points[(i + 2) % n],
            );
            if cross == 0.0 {
                continue;
            }
            if direction == 0.0 {
                direction = cross.signum();
            } else if cross.signum() != direction {
                return false;
            }
        }
        true
    }

    /// Computes the convex hull using Graham's scan algorithm.
    ///
    /// If the polygon has fewer than 3 points, returns a clone of it.
    pub fn convex_hull(&self) -> Polygon {
        if self.points.len() < 3 {
            return self.clone();
        }

        let mut points = self.points.clone();

        // Lowest y-coordinate, leftmost on ties
        let mut start_idx = 0;
        for i in 1..points.len() {
            if points[i].y < points[start_idx].y
                || (points[i].y == points[start_idx].y && points[i].x < points[start_idx].x)
            {
                start_idx = i;
            }
        }
        points.swap(0, start_idx);
        let start_point = points[0];

        // Sort points by polar angle with respect to the start point
        points[1..].sort_by(|a, b| {
            let cross = Self::cross_product(&start_point, a, b);
            if cross == 0.0 {
                let dist_a = (a.x - start_point.x).powi(2) + (a.y - start_point.y).powi(2);
                let dist_b = (b.x - start_point.x).powi(2) + (b.y - start_point.y).powi(2);
                dist_a.total_cmp(&dist_b)
            } else if cross > 0.0 {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            }
        });

        let mut hull: Vec<Point> = Vec::new();
        for point in points {
            while hull.len() > 1
                && Self::cross_product(&hull[hull.len() - 2], &hull[hull.len() - 1], &point) <= 0.0
            {
                hull.pop();
            }
            hull.push(point);
        }

        Polygon::new(hull)
    }

    /// Computes the cross product of three points.
    ///
    /// A positive value indicates a counter-clockwise turn, a negative value a
    /// clockwise turn, and zero collinearity.
    fn cross_product(p1: &Point, p2: &Point, p3: &Point) -> f32 {
        (p2.x - p1.x) * (p3.y - p1.y) - (p2.y - p1.y) * (p3.x - p1.x)
    }

    /// Simplifies the closed boundary with the Douglas-Peucker algorithm.
    ///
    /// The closing edge is taken into account by running the open-curve
    /// simplification on the boundary with its first vertex appended, then
    /// dropping the duplicate.
    pub fn approx_poly_dp(&self, epsilon: f32) -> Polygon {
        if self.points.len() <= 3 {
            return self.clone();
        }

        let mut closed = self.points.clone();
        closed.push(self.points[0]);

        let mut simplified = Vec::new();
        Self::douglas_peucker(&closed, epsilon, &mut simplified);
        simplified.pop();

        Polygon::new(simplified)
    }

    /// Implements the Douglas-Peucker algorithm for open curve simplification.
    fn douglas_peucker(points: &[Point], epsilon: f32, result: &mut Vec<Point>) {
        if points.len() <= 2 {
            result.extend_from_slice(points);
            return;
        }

        let mut stack = vec![(0, points.len() - 1)];

        let mut keep = vec![false; points.len()];
        keep[0] = true;
        keep[points.len() - 1] = true;

        while let Some((start, end)) = stack.pop() {
            if end - start <= 1 {
                continue;
            }

            let mut max_dist = 0.0;
            let mut max_index = start;

            for i in (start + 1)..end {
                let dist = Self::point_to_line_distance(&points[i], &points[start], &points[end]);
                if dist > max_dist {
                    max_dist = dist;
                    max_index = i;
                }
            }

            if max_dist > epsilon {
                keep[max_index] = true;

                if max_index - start > 1 {
                    stack.push((start, max_index));
                }
                if end - max_index > 1 {
                    stack.push((max_index, end));
                }
            }
        }

        result.extend(
            points
                .iter()
                .zip(keep.iter())
                .filter(|&(_, &k)| k)
                .map(|(p, _)| *p),
        );
    }

    /// Calculates the distance from a point to the line through a segment.
    ///
    /// Degenerate segments (start == end) fall back to the point distance, which
    /// matters for closed curves where the first and last vertex coincide.
    fn point_to_line_distance(point: &Point, line_start: &Point, line_end: &Point) -> f32 {
        let a = line_end.y - line_start.y;
        let b = line_start.x - line_end.x;
        let c = line_end.x * line_start.y - line_start.x * line_end.y;

        let denominator = (a * a + b * b).sqrt();
        if denominator == 0.0 {
            let dx = point.x - line_start.x;
            let dy = point.y - line_start.y;
            return (dx * dx + dy * dy).sqrt();
        }

        (a * point.x + b * point.y + c).abs() / denominator
    }
}
