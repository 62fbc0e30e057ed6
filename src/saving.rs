use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::PersistenceError;
use crate::point::Point;

/// Writes `points` as gzip-compressed bincode.
///
/// The data goes to a temporary file next to `path` first and is renamed into
/// place once complete, so a crash never leaves a half-written snapshot.
pub fn save_points(points: &[Point], path: impl AsRef<Path>) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let temp = NamedTempFile::new_in(dir)?;
    let encoder = GzEncoder::new(temp, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, points)?;

    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    let temp = encoder.finish()?;
    temp.persist(path).map_err(|e| e.error)?;

    log::debug!("Saved {} points to {}", points.len(), path.display());
    Ok(())
}

pub fn load_points(path: impl AsRef<Path>) -> Result<Vec<Point>, PersistenceError> {
    let file = File::open(path.as_ref())?;
    let decoder = GzDecoder::new(file);
    let mut reader = BufReader::new(decoder);

    let points: Vec<Point> = deserialize_from(&mut reader)?;

    log::debug!("Loaded {} points from {}", points.len(), path.as_ref().display());
    Ok(points)
}
