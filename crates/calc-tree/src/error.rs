//! Error type for the umbrella crate

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure between loading a grid and evaluating a tree
#[derive(Debug, Error)]
pub enum Error {
    /// Cell addressing error
    #[error(transparent)]
    Core(#[from] calc_tree_core::Error),

    /// Grid loading error
    #[error(transparent)]
    Csv(#[from] calc_tree_csv::CsvError),

    /// Tokenizing, parsing or evaluation error
    #[error(transparent)]
    Formula(#[from] calc_tree_formula::FormulaError),
}
