//! Error types for the pluvio workspace

use thiserror::Error;

/// Main error type for pluvio operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid grid dimensions: {rows}x{cols} (a one-cell halo requires at least 3x3)")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("Index out of bounds: ({row}, {col}) in grid of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Grid size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    ShapeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field '{0}' is derived by the solver and cannot be written")]
    ReadOnlyField(&'static str),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Time step {dt:.3e} s fell below the configured floor {floor:.3e} s")]
    CflCollapse { dt: f64, floor: f64 },

    #[error("Mass balance error {relative:.3e} exceeds the configured limit {limit:.3e}")]
    MassBalanceExceeded { relative: f64, limit: f64 },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for pluvio operations
pub type Result<T> = std::result::Result<T, Error>;
