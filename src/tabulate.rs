use crate::error::TabulateError;
use crate::mapper::{MathFunction, MathFunctionMapper};
use crate::point::Point;
use crate::validation::{MAX_POINTS_COUNT, MIN_POINTS};

/// Largest point count a preview is generated for.
pub const PREVIEW_LIMIT: usize = 1_000;

/// Samples `function` at `count` evenly spaced x values over `[left, right]`.
///
/// # Arguments
/// * `function` - The function to sample
/// * `left`, `right` - Interval bounds, `left < right`
/// * `count` - Number of samples, between 2 and 100 000
///
/// # Returns
/// * The sampled points; the first x is exactly `left` and the last exactly `right`
pub fn tabulate(
    function: &dyn MathFunction,
    left: f64,
    right: f64,
    count: usize,
) -> Result<Vec<Point>, TabulateError> {
    if count < MIN_POINTS as usize {
        return Err(TabulateError::Invalid(format!(
            "At least {} points are required, got {}",
            MIN_POINTS, count
        )));
    }
    if count > MAX_POINTS_COUNT as usize {
        return Err(TabulateError::Invalid(format!(
            "Too many points (maximum {})",
            MAX_POINTS_COUNT
        )));
    }
    if !left.is_finite() || !right.is_finite() {
        return Err(TabulateError::Invalid(
            "Interval bounds must be finite numbers".to_string(),
        ));
    }
    if left >= right {
        return Err(TabulateError::Invalid(
            "The left bound must be less than the right bound".to_string(),
        ));
    }

    let step = (right - left) / (count - 1) as f64;
    Ok((0..count)
        .map(|i| {
            let x = if i == count - 1 {
                right
            } else {
                left + step * i as f64
            };
            Point::new(x, function.apply(x))
        })
        .collect())
}

/// Looks `name` up in `mapper` and tabulates it.
pub fn tabulate_by_name(
    mapper: &MathFunctionMapper,
    name: &str,
    left: f64,
    right: f64,
    count: usize,
) -> Result<Vec<Point>, TabulateError> {
    let function = mapper
        .function_by_name(name)
        .ok_or_else(|| TabulateError::FunctionNotFound(name.to_string()))?;
    tabulate(function.as_ref(), left, right, count)
}

/// Same as [`tabulate_by_name`] but capped at [`PREVIEW_LIMIT`] points.
pub fn preview(
    mapper: &MathFunctionMapper,
    name: &str,
    left: f64,
    right: f64,
    count: usize,
) -> Result<Vec<Point>, TabulateError> {
    if count > PREVIEW_LIMIT {
        return Err(TabulateError::PreviewLimit {
            limit: PREVIEW_LIMIT,
            requested: count,
        });
    }
    tabulate_by_name(mapper, name, left, right, count)
}
