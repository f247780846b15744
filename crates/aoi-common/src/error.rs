//! Error types for area-of-interest geometry and grids.

use thiserror::Error;

use crate::bbox::BboxParseError;

/// Result type alias using AoiError.
pub type AoiResult<T> = Result<T, AoiError>;

#[derive(Debug, Error)]
pub enum AoiError {
    #[error("Degenerate bounding box: width {width}, height {height}")]
    DegenerateBox { width: f64, height: f64 },

    #[error(transparent)]
    InvalidBbox(#[from] BboxParseError),

    #[error("Grid is empty")]
    EmptyGrid,

    #[error("Ragged grid: row {row} has {found} values, expected {expected}")]
    RaggedGrid {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Non-finite value {value} at row {row}, column {col}")]
    NonFiniteValue { row: usize, col: usize, value: f64 },
}
