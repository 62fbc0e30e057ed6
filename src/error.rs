use thiserror::Error;

/// Failures reported by the chunked point processor.
///
/// Every variant is `Clone` so the processor can keep the last one around for
/// callers that poll instead of matching on the returned `Result`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessorError {
    #[error("Point limit of {max} exceeded. Requested count: {requested}")]
    LimitExceeded { max: usize, requested: usize },

    #[error("{description} failed: {cause}")]
    OperationFailed { description: String, cause: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Another operation is already in progress")]
    Busy,
}

/// Errors from saving, loading and parsing point sets.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode point set: {0}")]
    Encode(#[from] bincode::Error),

    #[error("Malformed CSV at line {line}: {reason}")]
    Csv { line: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from building a tabulated function out of a registered math function.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TabulateError {
    #[error("Function \"{0}\" is not registered")]
    FunctionNotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("Preview is limited to {limit} points, requested {requested}")]
    PreviewLimit { limit: usize, requested: usize },
}

/// Errors from post-processing API performance runs.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse run summary: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Run summary contains no executions")]
    Empty,
}

pub type Result<T> = std::result::Result<T, ProcessorError>;
