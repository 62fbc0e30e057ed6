use serde::{Deserialize, Serialize};

/// A single sample of a tabulated function.
///
/// A NaN `y` marks a missing value that `interpolate_missing` can fill in.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Bit-exact identity of a point, used for duplicate detection.
///
/// `-0.0` and `0.0` collapse to the same key and every NaN is treated as the
/// same value, so `(NaN, 1)` repeated twice counts as a duplicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PointKey(u64, u64);

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn key(&self) -> PointKey {
        PointKey(value_key(self.x), value_key(self.y))
    }

    pub fn has_missing_y(&self) -> bool {
        self.y.is_nan()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point { x, y }
    }
}

/// Normalised bit pattern of a coordinate for hashing.
pub fn value_key(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

// Convenience constructor for literal point lists
pub fn points_from_pairs(pairs: &[(f64, f64)]) -> Vec<Point> {
    pairs.iter().map(|&p| Point::from(p)).collect()
}

/// Approximate in-memory size of a point set, 16 bytes per point.
pub fn memory_estimate(count: usize) -> usize {
    count * std::mem::size_of::<Point>()
}
