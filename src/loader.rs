use crate::error::PersistenceError;
use crate::point::Point;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Load a point set from a CSV file
///
/// See [`parse_points_csv`] for the accepted format.
///
/// # Examples
/// ```no_run
/// use tabulated::loader::points_from_csv;
///
/// match points_from_csv("points.csv") {
///     Ok(points) => println!("Loaded {} points", points.len()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn points_from_csv(filepath: impl AsRef<Path>) -> Result<Vec<Point>, PersistenceError> {
    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    parse_lines(lines.iter().map(String::as_str))
}

/// Parse CSV text into points
///
/// Each non-blank line holds `x,y`. A first line whose x field is not a
/// number is treated as a header and skipped. An empty `y` field means a
/// missing value and becomes NaN; an empty `x` is an error.
///
/// # Errors
/// * `PersistenceError::Csv` with the 1-based line number of the first bad row
pub fn parse_points_csv(content: &str) -> Result<Vec<Point>, PersistenceError> {
    parse_lines(content.lines())
}

fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Vec<Point>, PersistenceError> {
    let mut points = Vec::new();

    for (index, raw) in lines.enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 2 {
            return Err(PersistenceError::Csv {
                line: line_no,
                reason: format!("expected 2 fields, found {}", fields.len()),
            });
        }

        let x = match fields[0].parse::<f64>() {
            Ok(x) => x,
            Err(_) if index == 0 => continue, // header
            Err(_) => {
                return Err(PersistenceError::Csv {
                    line: line_no,
                    reason: format!("invalid x value '{}'", fields[0]),
                });
            }
        };

        let y = if fields[1].is_empty() {
            f64::NAN
        } else {
            fields[1].parse::<f64>().map_err(|_| PersistenceError::Csv {
                line: line_no,
                reason: format!("invalid y value '{}'", fields[1]),
            })?
        };

        points.push(Point::new(x, y));
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::points_to_csv;
    use crate::point::points_from_pairs;

    #[test]
    fn header_and_blank_lines_are_skipped() {
        let points = parse_points_csv("x,y\n0,1\n\n2.5, 3\n").unwrap();
        assert_eq!(points, points_from_pairs(&[(0.0, 1.0), (2.5, 3.0)]));
    }

    #[test]
    fn headerless_input_is_accepted() {
        let points = parse_points_csv("1,2\n3,4").unwrap();
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn empty_y_is_missing() {
        let points = parse_points_csv("0,1\n1,\n2,3\n").unwrap();
        assert!(points[1].y.is_nan());
    }

    #[test]
    fn bad_rows_report_their_line() {
        match parse_points_csv("x,y\n0,1\nfoo,2\n") {
            Err(PersistenceError::Csv { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected CSV error, got {:?}", other),
        }
        match parse_points_csv("0,1,2\n") {
            Err(PersistenceError::Csv { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected CSV error, got {:?}", other),
        }
    }

    #[test]
    fn export_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.csv");
        let points = points_from_pairs(&[(0.0, 0.0), (0.5, 0.25), (1.0, 1.0)]);
        std::fs::write(&path, points_to_csv(&points)).unwrap();

        assert_eq!(points_from_csv(&path).unwrap(), points);
    }
}
