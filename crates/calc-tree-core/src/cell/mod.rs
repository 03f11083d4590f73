//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellData`] - What a cell holds: a number or a formula

mod address;
mod data;

pub use address::CellAddress;
pub use data::CellData;
