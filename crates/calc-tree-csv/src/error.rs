//! CSV error types

use thiserror::Error;

/// Result type for CSV operations
pub type CsvResult<T> = std::result::Result<T, CsvError>;

/// Errors that can occur while loading a CSV grid
#[derive(Debug, Error)]
pub enum CsvError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV library error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A field that is neither a number nor a formula
    #[error("Cell {address} is neither a number nor a formula: {content:?}")]
    UnsupportedCell { address: String, content: String },

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] calc_tree_core::Error),
}
