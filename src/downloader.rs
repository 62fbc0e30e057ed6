use crate::point::Point;
use crate::statistics::PointStatistics;
use std::fmt::Write;

/// Convert a point set to CSV format
///
/// The first line is the `x,y` header, followed by one row per point in set
/// order. A missing (NaN) value is written as an empty field so it reads back
/// as missing.
///
/// # Arguments
/// * `points` - The points to export
///
/// # Returns
/// * `String` - CSV content
///
/// # Examples
/// ```
/// use tabulated::point::Point;
/// use tabulated::downloader::points_to_csv;
///
/// let csv = points_to_csv(&[Point::new(0.0, 1.0), Point::new(0.5, f64::NAN)]);
/// assert_eq!(csv, "x,y\n0,1\n0.5,\n");
/// ```
pub fn points_to_csv(points: &[Point]) -> String {
    let mut csv_content = String::with_capacity(points.len() * 16 + 4);
    csv_content.push_str("x,y\n");

    for point in points {
        csv_content.push_str(&format_value(point.x));
        csv_content.push(',');
        csv_content.push_str(&format_value(point.y));
        csv_content.push('\n');
    }

    csv_content
}

/// Render a statistics snapshot as a two-column Markdown table
///
/// # Arguments
/// * `stats` - Snapshot from [`crate::statistics::compute_statistics`]
///
/// # Returns
/// * `String` - Markdown text
pub fn statistics_to_markdown(stats: &PointStatistics) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "| Metric | Value |");
    let _ = writeln!(md, "|--------|-------|");
    let _ = writeln!(md, "| Points | {} |", stats.total_points);
    let _ = writeln!(
        md,
        "| X range | {} .. {} (span {}) |",
        stats.x_range.min, stats.x_range.max, stats.x_range.span
    );
    let _ = writeln!(
        md,
        "| Y range | {} .. {} (span {}) |",
        stats.y_range.min, stats.y_range.max, stats.y_range.span
    );
    let _ = writeln!(md, "| Y average | {} |", stats.y_statistics.average);
    let _ = writeln!(md, "| Y std dev | {} |", stats.y_statistics.std_dev);
    let _ = writeln!(md, "| Y sum | {} |", stats.y_statistics.sum);
    let _ = writeln!(md, "| Duplicate X | {} |", stats.duplicates);
    let _ = writeln!(md, "| Memory estimate | {} bytes |", stats.memory_estimate);
    let _ = writeln!(md, "| Sorted by X | {} |", if stats.is_sorted { "yes" } else { "no" });
    md
}

fn format_value(v: f64) -> String {
    if v.is_nan() { String::new() } else { v.to_string() }
}
