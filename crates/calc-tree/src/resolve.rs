//! Cell resolution and what-if recalculation
//!
//! # Example
//!
//! ```rust
//! use calc_tree::prelude::*;
//!
//! let mut cells = CellMap::new();
//! cells.set_number("B1", 5.0).unwrap();
//! cells.set_number("B2", 6.0).unwrap();
//! cells.set_formula("B3", "=1 + 2").unwrap();
//! cells.set_formula("A1", "=(B1 + B2) * B3").unwrap();
//!
//! let resolved = cells.resolve("A1").unwrap();
//! assert_eq!(resolved.baseline, 33.0);
//!
//! let mut session = WhatIfSession::new(resolved);
//! session.set_override("B1", 1.0);
//! assert_eq!(session.recalculate().unwrap(), 21.0);
//! assert_eq!(session.display_value("A1"), Some(21.0));
//! ```

use crate::outline::{outline, CellPanel};
use calc_tree_core::CellMap;
use calc_tree_formula::{
    FormulaLookup, FormulaResult, NodeRef, Parser, ParserOptions, Recalculation, ValueMap,
};
use tracing::debug;

/// Options for resolving a cell
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// How referenced cells are expanded
    pub parser: ParserOptions,
}

/// A target cell expanded into its full tree, with the baseline already computed
#[derive(Debug, Clone)]
pub struct ResolvedCell {
    /// Address the tree was resolved for
    pub target: String,
    /// The expanded tree; its root is tagged with `target`
    pub tree: NodeRef,
    /// Value of the tree with every cell at its stored value
    pub baseline: f64,
}

impl ResolvedCell {
    /// Resolve `target` against any lookup and run the baseline pass
    pub fn resolve<L: FormulaLookup + ?Sized>(
        lookup: &L,
        target: &str,
        options: &ResolveOptions,
    ) -> FormulaResult<Self> {
        let tree = Parser::new(lookup)
            .with_options(options.parser.clone())
            .parse(target)?;
        let baseline = tree.evaluate_baseline()?;
        debug!(cell = target, baseline, "baseline computed");
        Ok(Self {
            target: target.to_string(),
            tree,
            baseline,
        })
    }

    /// Evaluate again with `overrides` replacing input cells
    pub fn recalculate(&self, overrides: &ValueMap) -> FormulaResult<Recalculation> {
        self.tree.recalculate(overrides)
    }

    /// Addresses of the cells an override can replace
    pub fn inputs(&self) -> Vec<String> {
        self.tree.input_addresses()
    }

    /// Nested per-cell panels of the tree
    pub fn outline(&self) -> Vec<CellPanel> {
        outline(&self.tree)
    }

    /// Baseline value of the first node tagged with `address`
    pub fn baseline_of(&self, address: &str) -> Option<f64> {
        self.tree
            .addressed_nodes()
            .into_iter()
            .find(|entry| entry.address == address)
            .and_then(|entry| entry.node.cached_value())
    }
}

/// Extension trait for CellMap to resolve cells into trees
pub trait CellMapResolveExt {
    /// Resolve a cell with default options
    fn resolve(&self, target: &str) -> FormulaResult<ResolvedCell>;

    /// Resolve a cell with custom options
    fn resolve_with_options(
        &self,
        target: &str,
        options: &ResolveOptions,
    ) -> FormulaResult<ResolvedCell>;
}

impl CellMapResolveExt for CellMap {
    fn resolve(&self, target: &str) -> FormulaResult<ResolvedCell> {
        self.resolve_with_options(target, &ResolveOptions::default())
    }

    fn resolve_with_options(
        &self,
        target: &str,
        options: &ResolveOptions,
    ) -> FormulaResult<ResolvedCell> {
        // `b4` and `$B$4` name the same root as `B4`
        let target = CellMap::key(target).unwrap_or_else(|_| target.to_string());
        ResolvedCell::resolve(self, &target, options)
    }
}

/// Interactive what-if state over one resolved cell
///
/// Overrides are keyed by address as spelled in the formulas. Results of successive
/// recalculations accumulate: a later pass replaces the values it visits and leaves
/// the rest.
#[derive(Debug, Clone)]
pub struct WhatIfSession {
    cell: ResolvedCell,
    /// Addresses of the literal cells, the only ones an override reaches
    inputs: Vec<String>,
    overrides: ValueMap,
    results: ValueMap,
}

impl WhatIfSession {
    /// Start a session with no overrides
    pub fn new(cell: ResolvedCell) -> Self {
        Self {
            inputs: cell.inputs(),
            cell,
            overrides: ValueMap::new(),
            results: ValueMap::new(),
        }
    }

    /// The resolved cell
    pub fn cell(&self) -> &ResolvedCell {
        &self.cell
    }

    /// Addresses an override can replace
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Current overrides
    pub fn overrides(&self) -> &ValueMap {
        &self.overrides
    }

    /// Values from all recalculations so far
    pub fn results(&self) -> &ValueMap {
        &self.results
    }

    /// Replace the value of an input cell for the next recalculation
    pub fn set_override(&mut self, address: &str, value: f64) {
        self.overrides.insert(address.to_string(), value);
    }

    /// Drop an override, returning its value
    pub fn clear_override(&mut self, address: &str) -> Option<f64> {
        self.overrides.remove(address)
    }

    /// Evaluate with the current overrides and merge the per-cell results
    pub fn recalculate(&mut self) -> FormulaResult<f64> {
        let Recalculation { value, cells } = self.cell.recalculate(&self.overrides)?;
        debug!(
            cell = %self.cell.target,
            value,
            overrides = self.overrides.len(),
            "recalculated"
        );
        self.results.extend(cells);
        Ok(value)
    }

    /// The value to show for `address`
    ///
    /// For an input cell an override wins. Otherwise the latest recalculated value
    /// is shown, then the baseline. Formula cells ignore overrides, as evaluation does.
    pub fn display_value(&self, address: &str) -> Option<f64> {
        self.overrides
            .get(address)
            .filter(|_| self.inputs.iter().any(|a| a == address))
            .or_else(|| self.results.get(address))
            .copied()
            .or_else(|| self.cell.baseline_of(address))
    }
}
