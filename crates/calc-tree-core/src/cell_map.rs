//! Address → cell content store

use crate::cell::{CellAddress, CellData};
use crate::error::Result;
use ahash::AHashMap;

/// A sheet's numeric and formula cells, keyed by normalized A1 address
///
/// Keys are stored relative and upper-case, so `$b$3`, `B$3` and `B3` all name the
/// same cell. This is the mapping a workbook reader hands to the formula engine.
#[derive(Debug, Clone, Default)]
pub struct CellMap {
    cells: AHashMap<String, CellData>,
}

impl CellMap {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize an address string to the key it is stored under
    pub fn key(address: &str) -> Result<String> {
        Ok(CellAddress::parse(address)?.to_a1_string())
    }

    /// Store a cell, replacing any previous content
    pub fn insert(&mut self, address: &str, data: CellData) -> Result<()> {
        let key = Self::key(address)?;
        self.cells.insert(key, data);
        Ok(())
    }

    /// Store a cell by 0-based grid position
    pub fn insert_at(&mut self, row: u32, col: u16, data: CellData) {
        let key = CellAddress::new(row, col).to_a1_string();
        self.cells.insert(key, data);
    }

    /// Store a numeric cell
    pub fn set_number(&mut self, address: &str, value: f64) -> Result<()> {
        self.insert(address, CellData::Number(value))
    }

    /// Store a formula cell (the leading `=` is optional)
    pub fn set_formula(&mut self, address: &str, text: &str) -> Result<()> {
        self.insert(address, CellData::formula(text))
    }

    /// Remove a cell, returning its content
    pub fn remove(&mut self, address: &str) -> Option<CellData> {
        let key = Self::key(address).ok()?;
        self.cells.remove(&key)
    }

    /// Get a cell; malformed addresses simply find nothing
    pub fn get(&self, address: &str) -> Option<&CellData> {
        let key = Self::key(address).ok()?;
        self.cells.get(&key)
    }

    /// Raw content string for a cell, as the tokenizer expects it
    pub fn raw_content(&self, address: &str) -> Option<String> {
        self.get(address).map(CellData::raw_content)
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if no cells are stored
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over `(address, cell)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellData)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Stored addresses in row-major order
    pub fn addresses(&self) -> Vec<String> {
        let mut positions: Vec<CellAddress> = self
            .cells
            .keys()
            .filter_map(|k| CellAddress::parse(k).ok())
            .collect();
        positions.sort_by_key(|a| (a.row, a.col));
        positions.iter().map(CellAddress::to_a1_string).collect()
    }
}
