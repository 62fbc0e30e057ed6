use crate::error::PersistenceError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tuning knobs for [`crate::processor::ChunkedPointProcessor`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessorConfig {
    /// Upper bound on the number of points held at any time
    #[serde(default = "default_max_points")]
    pub max_points: usize,

    /// Number of points handled per processing step
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Sets larger than this are sorted chunk by chunk and then merged
    #[serde(default = "default_sort_threshold")]
    pub sort_threshold: usize,

    /// Chunks larger than this yield to the runtime before being processed
    #[serde(default = "default_yield_threshold")]
    pub yield_threshold: usize,

    /// Delay before a finished operation's progress drops back to 0
    #[serde(default = "default_progress_reset_ms")]
    pub progress_reset_ms: u64,
}

fn default_max_points() -> usize {
    10_000
}
fn default_chunk_size() -> usize {
    1_000
}
fn default_sort_threshold() -> usize {
    5_000
}
fn default_yield_threshold() -> usize {
    500
}
fn default_progress_reset_ms() -> u64 {
    2_000
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_points: default_max_points(),
            chunk_size: default_chunk_size(),
            sort_threshold: default_sort_threshold(),
            yield_threshold: default_yield_threshold(),
            progress_reset_ms: default_progress_reset_ms(),
        }
    }
}

impl ProcessorConfig {
    pub fn new(max_points: usize, chunk_size: usize) -> Self {
        Self {
            max_points,
            chunk_size,
            ..Self::default()
        }
    }

    pub fn progress_reset_delay(&self) -> Duration {
        Duration::from_millis(self.progress_reset_ms)
    }

    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.chunk_size == 0 {
            return Err(PersistenceError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.max_points == 0 {
            return Err(PersistenceError::Config(
                "max_points must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Reads a config from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let content = std::fs::read_to_string(path)?;
        let config: ProcessorConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ProcessorConfig = serde_json::from_str(r#"{"chunk_size": 2}"#).unwrap();
        assert_eq!(config.chunk_size, 2);
        assert_eq!(config.max_points, 10_000);
        assert_eq!(config.sort_threshold, 5_000);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(ProcessorConfig::new(100, 0).validate().is_err());
        assert!(ProcessorConfig::new(0, 10).validate().is_err());
        assert!(ProcessorConfig::new(100, 10).validate().is_ok());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processor.json");
        std::fs::write(&path, r#"{"max_points": 50, "progress_reset_ms": 0}"#).unwrap();

        let config = ProcessorConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_points, 50);
        assert_eq!(config.progress_reset_delay(), Duration::ZERO);
    }
}
