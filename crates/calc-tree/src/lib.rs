//! # calc-tree
//!
//! Resolve a spreadsheet cell into the full tree of everything it is calculated
//! from, then ask what-if questions of it.
//!
//! ## Features
//!
//! - Load numeric and formula cells from CSV
//! - Expand a target cell's formula, and every formula it references, into one tree
//! - Baseline evaluation with per-node cached values
//! - Recalculation with overridden input cells and per-cell results
//! - A nested per-cell outline of the tree
//!
//! ## Example
//!
//! ```rust
//! use calc_tree::prelude::*;
//!
//! let cells = CsvReader::read("5,6,=1 + 2\n=(A1 + B1) * C1\n".as_bytes(), &CsvReadOptions::default()).unwrap();
//!
//! let resolved = cells.resolve("A2").unwrap();
//! assert_eq!(resolved.baseline, 33.0);
//! assert_eq!(resolved.inputs(), vec!["A1", "B1"]);
//!
//! let mut session = WhatIfSession::new(resolved);
//! session.set_override("A1", 1.0);
//! assert_eq!(session.recalculate().unwrap(), 21.0);
//! ```

pub mod error;
pub mod outline;
pub mod prelude;
pub mod resolve;

pub use error::{Error, Result};
pub use outline::{outline, CellPanel, PanelKind};
pub use resolve::{CellMapResolveExt, ResolveOptions, ResolvedCell, WhatIfSession};

// Re-export core types
pub use calc_tree_core::{CellAddress, CellData, CellMap, MAX_COLS, MAX_ROWS};

// Re-export formula types
pub use calc_tree_formula::{
    evaluate, parse, tokenize, FormulaError, FormulaLookup, FormulaResult, FunctionName,
    LookupFn, MissingReference, NoCells, NodeKind, NodeRef, Parser, ParserOptions,
    Recalculation, SyntaxTreeNode, Token, ValueMap,
};

// Re-export I/O types
pub use calc_tree_csv::{CsvError, CsvReadOptions, CsvReader, TextCells};

use std::path::Path;

/// Load a CSV grid and resolve `target` in it
pub fn resolve_csv<P: AsRef<Path>>(
    path: P,
    target: &str,
    csv_options: &CsvReadOptions,
    options: &ResolveOptions,
) -> Result<(CellMap, ResolvedCell)> {
    let cells = CsvReader::read_file(path, csv_options)?;
    let resolved = cells.resolve_with_options(target, options)?;
    Ok((cells, resolved))
}
