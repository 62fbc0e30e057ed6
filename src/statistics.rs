use crate::point::{Point, memory_estimate, value_key};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    pub span: f64,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct YStatistics {
    pub average: f64,
    pub std_dev: f64,
    pub sum: f64,
}

/// Read-only summary of a point set.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct PointStatistics {
    pub total_points: usize,
    pub x_range: AxisRange,
    pub y_range: AxisRange,
    pub y_statistics: YStatistics,
    /// Number of points whose x value already appeared earlier in the set
    pub duplicates: usize,
    /// Approximate footprint in bytes
    pub memory_estimate: usize,
    /// Whether x is non-decreasing
    pub is_sorted: bool,
}

/// Computes the statistics snapshot for `points`, or `None` when it is empty.
///
/// Minimum and maximum propagate NaN, and the standard deviation is the
/// population one (divides by `n`).
pub fn compute_statistics(points: &[Point]) -> Option<PointStatistics> {
    if points.is_empty() {
        return None;
    }

    let x_range = axis_range(points.iter().map(|p| p.x));
    let y_range = axis_range(points.iter().map(|p| p.y));

    let count = points.len() as f64;
    let sum: f64 = points.iter().map(|p| p.y).sum();
    let average = sum / count;
    let variance = points
        .iter()
        .map(|p| {
            let diff = p.y - average;
            diff * diff
        })
        .sum::<f64>()
        / count;

    let distinct_x: HashSet<u64> = points.iter().map(|p| value_key(p.x)).collect();

    Some(PointStatistics {
        total_points: points.len(),
        x_range,
        y_range,
        y_statistics: YStatistics {
            average,
            std_dev: variance.sqrt(),
            sum,
        },
        duplicates: points.len() - distinct_x.len(),
        memory_estimate: memory_estimate(points.len()),
        is_sorted: is_sorted_by_x(points),
    })
}

pub fn is_sorted_by_x(points: &[Point]) -> bool {
    points.windows(2).all(|w| w[1].x >= w[0].x)
}

fn axis_range(values: impl Iterator<Item = f64>) -> AxisRange {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (nan_min(lo, v), nan_max(hi, v))
    });
    AxisRange {
        min,
        max,
        span: max - min,
    }
}

fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.min(b) }
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() { f64::NAN } else { a.max(b) }
}
