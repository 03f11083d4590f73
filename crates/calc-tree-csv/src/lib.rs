//! # calc-tree-csv
//!
//! Loads a CSV grid into a [`CellMap`](calc_tree_core::CellMap).
//!
//! Field positions map onto A1 addresses: the first field of the first data row is
//! `A1`. Numeric fields become number cells, fields starting with `=` become
//! formula cells, empty fields are left out.

mod error;
mod options;
mod reader;

pub use error::{CsvError, CsvResult};
pub use options::{CsvReadOptions, TextCells};
pub use reader::CsvReader;
