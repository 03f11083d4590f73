//! CSV options

/// What to do with fields that are neither numbers nor formulas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextCells {
    /// Fail with [`CsvError::UnsupportedCell`](crate::CsvError::UnsupportedCell)
    #[default]
    Reject,
    /// Leave the cell out of the grid
    Skip,
}

/// Options for reading CSV files
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    /// Field delimiter (default: comma)
    pub delimiter: u8,
    /// Quote character (default: double quote)
    pub quote: u8,
    /// Whether the first row is a header and not part of the grid
    pub has_header: bool,
    /// Handling of text fields
    pub text_cells: TextCells,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            has_header: false,
            text_cells: TextCells::Reject,
        }
    }
}
