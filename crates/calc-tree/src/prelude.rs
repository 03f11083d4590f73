//! Prelude module - common imports for calc-tree users
//!
//! ```rust
//! use calc_tree::prelude::*;
//! ```

pub use crate::{
    // Cell store
    CellData,
    CellMap,
    // Extension traits
    CellMapResolveExt,
    // I/O types
    CsvReadOptions,
    CsvReader,
    // Error types
    Error,
    FormulaError,
    // Options
    MissingReference,
    ParserOptions,
    ResolveOptions,
    // Resolution and what-if
    ResolvedCell,
    Result,
    ValueMap,
    WhatIfSession,
};
