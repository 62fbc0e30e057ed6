/*!
# Tabulated

Processing and tooling for tabulated functions: discrete point sets sampled
from math functions or entered by hand.

## Overview

The heart of the crate is the chunked point processor. It holds one ordered
point set and applies bulk operations to it (filtering, sorting, duplicate
removal, interpolation of missing values, compression, statistics) in
bounded-size chunks, yielding to the async runtime between large chunks so
an interactive host stays responsive while tens of thousands of points are
processed.

## Architecture

### Processing Layer
- **Chunked Point Processor** - Owns the point set, enforces the point limit,
  reports progress through a watch channel and keeps the last error
- **Statistics** - Ranges, mean and standard deviation, duplicate count,
  sortedness
- **Validation** - Form-level checks for sizes, point lists and intervals

### Function Layer
- **Math Function Mapper** - Caller-owned registry between display names and
  function instances
- **Tabulation** - Evenly spaced sampling of a registered function

### Data Persistence Layer
- Gzip-compressed bincode snapshots of point sets
- CSV import and export

### Reporting Layer
- PNG previews of point sets (feature `plot`)
- API performance reports from Newman run exports (CSV, Markdown, JSON)

## Concurrency

Operations run on the calling task. A single-operation-in-flight guard
rejects overlapping operations with `ProcessorError::Busy`. Results commit
atomically: a failed operation never leaves a partial result installed.

## Modules

- **point**: Point type and duplicate keys
- **config**: Processor configuration
- **error**: Error types for every layer
- **processor**: The chunked point processor
- **statistics**: Point set statistics
- **validation**: Input validation rules
- **mapper**: Math function registry
- **tabulate**: Sampling functions into point sets
- **saving**: Binary snapshots
- **loader**: CSV import
- **downloader**: CSV and Markdown export
- **report**: API performance reports
- **graph**: Preview rendering
*/

pub mod config;
pub mod downloader;
pub mod error;
#[cfg(feature = "plot")]
pub mod graph;
pub mod loader;
pub mod mapper;
pub mod point;
pub mod processor;
pub mod report;
pub mod saving;
pub mod statistics;
pub mod tabulate;
pub mod validation;

/// Re-export the most used items to make them easier to reach
pub use config::ProcessorConfig;
pub use error::{PersistenceError, ProcessorError, ReportError, TabulateError};
pub use mapper::{MathFunction, MathFunctionInfo, MathFunctionMapper};
pub use point::Point;
pub use processor::ChunkedPointProcessor;
pub use statistics::{PointStatistics, compute_statistics};
pub use validation::{ValidationKind, ValidationResult};
