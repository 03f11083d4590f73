//! # calc-tree-core
//!
//! Core data structures for the calc-tree formula explorer.
//!
//! This crate provides:
//! - [`CellAddress`] - A1-style cell addressing
//! - [`CellData`] - The numeric or formula content of one cell
//! - [`CellMap`] - An address → content store that renders the raw content
//!   strings the formula engine consumes
//!
//! ## Example
//!
//! ```rust
//! use calc_tree_core::{CellData, CellMap};
//!
//! let mut cells = CellMap::new();
//! cells.set_number("B3", 6.0).unwrap();
//! cells.set_formula("B4", "B3 * 2").unwrap();
//!
//! assert_eq!(cells.raw_content("B3").as_deref(), Some("6"));
//! assert_eq!(cells.raw_content("B4").as_deref(), Some("=B3 * 2"));
//! assert_eq!(cells.get("B3"), Some(&CellData::Number(6.0)));
//! ```

pub mod cell;
pub mod cell_map;
pub mod error;

pub use cell::{CellAddress, CellData};
pub use cell_map::CellMap;
pub use error::{Error, Result};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
