//! The formula-lookup capability consumed by the parser

use calc_tree_core::CellMap;
use std::borrow::Cow;
use std::collections::HashMap;
use std::hash::BuildHasher;

/// Anything that can answer "what is the raw content of this cell?"
///
/// Content is either a plain numeric literal (`"6"`) or a formula starting with `=`
/// (`"=B3 * 2"`). `None` means the address is unknown; what the parser does with
/// that is decided by [`MissingReference`](crate::MissingReference).
///
/// Implementations must be side-effect free from the parser's point of view: the
/// same address may be looked up more than once.
pub trait FormulaLookup {
    /// Raw content of the cell at `address`
    fn lookup(&self, address: &str) -> Option<Cow<'_, str>>;
}

impl<S: BuildHasher> FormulaLookup for HashMap<String, String, S> {
    fn lookup(&self, address: &str) -> Option<Cow<'_, str>> {
        self.get(address).map(|s| Cow::Borrowed(s.as_str()))
    }
}

impl FormulaLookup for CellMap {
    fn lookup(&self, address: &str) -> Option<Cow<'_, str>> {
        self.raw_content(address).map(Cow::Owned)
    }
}

/// Adapter turning a closure into a [`FormulaLookup`]
///
/// ```rust
/// use calc_tree_formula::{FormulaLookup, LookupFn};
///
/// let lookup = LookupFn(|address: &str| (address == "A1").then(|| "=1+2".to_string()));
/// assert_eq!(lookup.lookup("A1").as_deref(), Some("=1+2"));
/// assert_eq!(lookup.lookup("B1"), None);
/// ```
pub struct LookupFn<F>(pub F);

impl<F> FormulaLookup for LookupFn<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, address: &str) -> Option<Cow<'_, str>> {
        (self.0)(address).map(Cow::Owned)
    }
}

/// A lookup that knows no cells at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCells;

impl FormulaLookup for NoCells {
    fn lookup(&self, _address: &str) -> Option<Cow<'_, str>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hash_map_lookup() {
        let mut cells = HashMap::new();
        cells.insert("B3".to_string(), "6".to_string());
        assert_eq!(cells.lookup("B3").as_deref(), Some("6"));
        assert_eq!(cells.lookup("B4"), None);
    }

    #[test]
    fn test_cell_map_lookup() {
        let mut cells = CellMap::new();
        cells.set_formula("B4", "B3*2").unwrap();
        cells.set_number("B3", 6.0).unwrap();
        assert_eq!(cells.lookup("B4").as_deref(), Some("=B3*2"));
        assert_eq!(cells.lookup("$B$3").as_deref(), Some("6"));
        assert_eq!(cells.lookup("A1:A3"), None);
    }

    #[test]
    fn test_no_cells() {
        assert_eq!(NoCells.lookup("A1"), None);
    }
}
