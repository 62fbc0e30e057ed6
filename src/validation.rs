use crate::point::{Point, value_key};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

lazy_static! {
    static ref LEADING_INT_REGEX: Regex = Regex::new(r"^\s*([+-]?[0-9]+)").unwrap();
    static ref LEADING_FLOAT_REGEX: Regex =
        Regex::new(r"^\s*([+-]?(?:Infinity|(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?))")
            .unwrap();
}

/// Upper bound above which a requested size only produces a warning.
pub const SIZE_WARNING_THRESHOLD: i64 = 10_000;
/// Hard upper bound on the number of points a function can be tabulated with.
pub const MAX_POINTS_COUNT: i64 = 100_000;
/// Smallest point count that still describes a function.
pub const MIN_POINTS: i64 = 2;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationKind {
    EmptyField,
    InvalidNumber,
    NegativeSize,
    TooLargeSize,
    DuplicateX,
    InvalidInterval,
}

/// Outcome of a form-level check.
///
/// A valid result can still carry a kind and message, which callers show as
/// a warning (see [`validate_size`]).
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub kind: Option<ValidationKind>,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        ValidationResult {
            is_valid: true,
            kind: None,
            message: None,
        }
    }

    pub fn invalid(kind: ValidationKind, message: impl Into<String>) -> Self {
        ValidationResult {
            is_valid: false,
            kind: Some(kind),
            message: Some(message.into()),
        }
    }

    pub fn warning(kind: ValidationKind, message: impl Into<String>) -> Self {
        ValidationResult {
            is_valid: true,
            kind: Some(kind),
            message: Some(message.into()),
        }
    }

    pub fn is_warning(&self) -> bool {
        self.is_valid && self.kind.is_some()
    }
}

/// Parses the leading integer of `s`, ignoring trailing garbage (`"12abc"` is 12).
pub fn parse_leading_int(s: &str) -> Option<i64> {
    LEADING_INT_REGEX
        .captures(s)
        .and_then(|caps| caps[1].parse::<i64>().ok())
}

/// Parses the leading decimal number of `s`, ignoring trailing garbage.
pub fn parse_leading_float(s: &str) -> Option<f64> {
    LEADING_FLOAT_REGEX.captures(s).and_then(|caps| {
        let number = &caps[1];
        match number.trim_start_matches(['+', '-']) {
            "Infinity" if number.starts_with('-') => Some(f64::NEG_INFINITY),
            "Infinity" => Some(f64::INFINITY),
            _ => number.parse::<f64>().ok(),
        }
    })
}

pub fn validate_size(size: &str) -> ValidationResult {
    if size.trim().is_empty() {
        return ValidationResult::invalid(
            ValidationKind::EmptyField,
            "Please enter the number of points",
        );
    }

    let num = match parse_leading_int(size) {
        Some(n) => n,
        None => {
            return ValidationResult::invalid(
                ValidationKind::InvalidNumber,
                "The number of points must be a number",
            );
        }
    };

    if num < 0 {
        return ValidationResult::invalid(
            ValidationKind::NegativeSize,
            "The number of points cannot be negative",
        );
    }
    if num < MIN_POINTS {
        return ValidationResult::invalid(
            ValidationKind::InvalidNumber,
            "The minimum number of points is 2",
        );
    }
    if num > SIZE_WARNING_THRESHOLD {
        return ValidationResult::warning(
            ValidationKind::TooLargeSize,
            format!("You entered {} points. This may slow things down.", num),
        );
    }

    ValidationResult::ok()
}

pub fn validate_points(points: &[Point]) -> ValidationResult {
    if points.len() < MIN_POINTS as usize {
        return ValidationResult::invalid(
            ValidationKind::InvalidNumber,
            "A function must contain at least 2 points",
        );
    }

    let unique_x: HashSet<u64> = points.iter().map(|p| value_key(p.x)).collect();
    if unique_x.len() != points.len() {
        return ValidationResult::invalid(ValidationKind::DuplicateX, "X values must be unique");
    }

    if points.windows(2).any(|w| w[1].x < w[0].x) {
        return ValidationResult::invalid(
            ValidationKind::InvalidNumber,
            "X values must be in ascending order",
        );
    }

    ValidationResult::ok()
}

pub fn validate_points_count(count: &str) -> ValidationResult {
    let num = match parse_leading_int(count) {
        Some(n) => n,
        None => {
            return ValidationResult::invalid(
                ValidationKind::InvalidNumber,
                "The number of points must be a number",
            );
        }
    };

    if num < MIN_POINTS {
        return ValidationResult::invalid(ValidationKind::InvalidNumber, "At least 2 points");
    }
    if num > MAX_POINTS_COUNT {
        return ValidationResult::invalid(
            ValidationKind::TooLargeSize,
            format!("Too many points (maximum {})", MAX_POINTS_COUNT),
        );
    }

    ValidationResult::ok()
}

pub fn validate_interval(left: &str, right: &str) -> ValidationResult {
    let (left, right) = match (parse_leading_float(left), parse_leading_float(right)) {
        (Some(l), Some(r)) => (l, r),
        _ => {
            return ValidationResult::invalid(
                ValidationKind::InvalidNumber,
                "Interval bounds must be numbers",
            );
        }
    };

    if left >= right {
        return ValidationResult::invalid(
            ValidationKind::InvalidInterval,
            "The left bound must be less than the right bound",
        );
    }

    ValidationResult::ok()
}
