#![cfg(feature = "plot")]
use crate::point::Point;
use crate::processor::decimate;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

/// How the preview draws the samples
#[derive(Clone, Debug)]
pub enum PreviewStyle {
    /// Samples joined by straight segments
    Line,

    /// One marker per sample
    Scatter,
}

/// Configuration options for preview rendering
#[derive(Clone, Debug)]
pub struct PreviewOptions {
    /// Title displayed at the top of the graph
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,

    pub style: PreviewStyle,

    /// Points are decimated down to this many before drawing
    pub max_points: usize,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            title: "Function preview".to_string(),
            x_label: "x".to_string(),
            y_label: "f(x)".to_string(),
            width: 800,
            height: 600,
            style: PreviewStyle::Line,
            max_points: 1000,
        }
    }
}

/// Renders a preview of `points` and returns the PNG bytes
///
/// The image is drawn into a temporary file which is read back and removed.
///
/// # Arguments
/// * `points` - The point set to draw; only finite points are plotted
/// * `options` - Styling and size options
///
/// # Returns
/// * A Result containing the PNG image data as bytes or an error
pub fn render_preview(
    points: &[Point],
    options: &PreviewOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let temp = tempfile::Builder::new().suffix(".png").tempfile()?;
    save_preview(points, options, temp.path())?;
    let buffer = std::fs::read(temp.path())?;
    Ok(buffer)
}

/// Renders a preview of `points` straight to `path`
pub fn save_preview(
    points: &[Point],
    options: &PreviewOptions,
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let data: Vec<(f64, f64)> = decimate(points, options.max_points)
        .into_iter()
        .filter(Point::is_finite)
        .map(|p| (p.x, p.y))
        .collect();

    let root = BitMapBackend::new(path.as_ref(), (options.width, options.height))
        .into_drawing_area();
    root.fill(&WHITE)?;

    let x_range = axis_range(data.iter().map(|(x, _)| *x));
    let y_range = axis_range(data.iter().map(|(_, y)| *y));

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .draw()?;

    match options.style {
        PreviewStyle::Line => {
            chart.draw_series(LineSeries::new(data.iter().copied(), &BLUE))?;
        }
        PreviewStyle::Scatter => {
            chart.draw_series(
                data.iter()
                    .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
            )?;
        }
    }

    root.present()?;
    Ok(())
}

/// Axis range covering `values`, widened when empty or degenerate
pub fn axis_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if min == max {
        return (min - 1.0)..(max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}
