//! Deterministic 2-D node placement for the graph plots

use std::f64::consts::TAU;
use std::ops::Range;

pub type Point = (f64, f64);

/// Radius of the ring that community centers sit on
const COMMUNITY_RING_RADIUS: f64 = 10.0;

/// Two vertical columns: left nodes at x = 0, right nodes at x = 3
pub fn two_column(
    left: usize,
    right: usize,
    left_spacing: f64,
    right_spacing: f64,
) -> (Vec<Point>, Vec<Point>) {
    let left_points = (0..left).map(|i| (0.0, i as f64 * left_spacing)).collect();
    let right_points = (0..right).map(|i| (3.0, i as f64 * right_spacing)).collect();
    (left_points, right_points)
}

/// `n` points evenly spaced on a circle around the origin
pub fn circular(n: usize, radius: f64) -> Vec<Point> {
    ring((0.0, 0.0), n, radius)
}

/// Communities placed on a large ring, members on a small ring around each
/// community center. Singletons sit exactly on their center.
///
/// Returns one position list per community, in the order of `sizes`.
pub fn grouped_circular(sizes: &[usize]) -> Vec<Vec<Point>> {
    let centers = if sizes.len() == 1 {
        vec![(0.0, 0.0)]
    } else {
        circular(sizes.len(), COMMUNITY_RING_RADIUS)
    };

    sizes
        .iter()
        .zip(centers)
        .map(|(&size, center)| {
            let radius = if size <= 1 { 0.0 } else { 0.8 + 0.2 * size as f64 };
            ring(center, size, radius)
        })
        .collect()
}

fn ring(center: Point, n: usize, radius: f64) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let angle = TAU * i as f64 / n as f64;
            (center.0 + radius * angle.cos(), center.1 + radius * angle.sin())
        })
        .collect()
}

/// Axis ranges covering all points with `padding` on every side.
/// An empty input yields the unit square.
pub fn padded_bounds(points: &[Point], padding: f64) -> (Range<f64>, Range<f64>) {
    if points.is_empty() {
        return (0.0..1.0, 0.0..1.0);
    }

    let x_min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let y_min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let y_max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    ((x_min - padding)..(x_max + padding), (y_min - padding)..(y_max + padding))
}
