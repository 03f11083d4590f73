//! # calc-tree-formula
//!
//! Formula engine for calc-tree.
//!
//! This crate provides:
//! - Tokenizing raw cell content (text → tokens)
//! - Reference-expanding parsing (target cell → fully inlined syntax tree)
//! - Tree evaluation with a baseline cache, value overrides and per-cell results
//!
//! ## Example
//!
//! ```rust
//! use calc_tree_formula::{parse, ValueMap};
//! use std::collections::HashMap;
//!
//! let mut cells = HashMap::new();
//! cells.insert("B1".to_string(), "5".to_string());
//! cells.insert("B2".to_string(), "6".to_string());
//! cells.insert("B3".to_string(), "=1 + 2".to_string());
//! cells.insert("A1".to_string(), "=(B1 + B2) * B3".to_string());
//!
//! let tree = parse("A1", &cells).unwrap();
//! assert_eq!(tree.evaluate_baseline().unwrap(), 33.0);
//!
//! let mut overrides = ValueMap::new();
//! overrides.insert("B1".to_string(), 1.0);
//! let result = tree.recalculate(&overrides).unwrap();
//! assert_eq!(result.value, 21.0);
//! assert_eq!(result.cells["B2"], 6.0);
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod lookup;
pub mod numeric;
pub mod parser;
pub mod token;

pub use ast::{AddressedNode, BinaryOperator, FunctionName, NodeKind, NodeRef, SyntaxTreeNode};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, Recalculation, ValueMap};
pub use lookup::{FormulaLookup, LookupFn, NoCells};
pub use numeric::{is_numeric, parse_numeric, round_to_places};
pub use parser::{parse, MissingReference, Parser, ParserOptions};
pub use token::{tokenize, Token};
