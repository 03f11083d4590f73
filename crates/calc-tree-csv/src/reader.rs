//! CSV reader

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::options::{CsvReadOptions, TextCells};
use calc_tree_core::{CellAddress, CellData, CellMap, Error, MAX_COLS, MAX_ROWS};
use calc_tree_formula::parse_numeric;
use tracing::{debug, trace};

/// CSV grid reader
pub struct CsvReader;

impl CsvReader {
    /// Read a CSV file into a cell map
    pub fn read_file<P: AsRef<Path>>(path: P, options: &CsvReadOptions) -> CsvResult<CellMap> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading CSV grid");
        let file = File::open(path)?;
        Self::read(file, options)
    }

    /// Read CSV from a reader into a cell map
    pub fn read<R: Read>(reader: R, options: &CsvReadOptions) -> CsvResult<CellMap> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(options.has_header)
            .flexible(true)
            .from_reader(reader);

        let mut cells = CellMap::new();

        for (row_idx, result) in csv_reader.records().enumerate() {
            let record = result?;
            let row = u32::try_from(row_idx)
                .ok()
                .filter(|r| *r < MAX_ROWS)
                .ok_or(Error::RowOutOfBounds(u32::MAX, MAX_ROWS - 1))?;

            for (col_idx, field) in record.iter().enumerate() {
                let field = field.trim();
                if field.is_empty() {
                    continue;
                }

                let col = u16::try_from(col_idx)
                    .ok()
                    .filter(|c| *c < MAX_COLS)
                    .ok_or(Error::ColumnOutOfBounds(u16::MAX, MAX_COLS - 1))?;

                match Self::classify(field) {
                    Some(data) => cells.insert_at(row, col, data),
                    None => {
                        let address = CellAddress::new(row, col).to_a1_string();
                        match options.text_cells {
                            TextCells::Reject => {
                                return Err(CsvError::UnsupportedCell {
                                    address,
                                    content: field.to_string(),
                                })
                            }
                            TextCells::Skip => trace!(address, "skipping text cell"),
                        }
                    }
                }
            }
        }

        debug!(cells = cells.len(), "CSV grid loaded");
        Ok(cells)
    }

    /// Decide what a non-empty field holds
    fn classify(field: &str) -> Option<CellData> {
        if field.starts_with('=') {
            return Some(CellData::formula(field));
        }
        parse_numeric(field).map(CellData::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn read_str(data: &str, options: &CsvReadOptions) -> CsvResult<CellMap> {
        CsvReader::read(data.as_bytes(), options)
    }

    #[test]
    fn test_grid_positions() {
        let cells = read_str("5,6,=1 + 2\n=(B1 + B2) * C1,,7\n", &CsvReadOptions::default()).unwrap();

        assert_eq!(cells.len(), 5);
        assert_eq!(cells.get("A1"), Some(&CellData::Number(5.0)));
        assert_eq!(cells.raw_content("C1").as_deref(), Some("=1 + 2"));
        assert_eq!(cells.raw_content("A2").as_deref(), Some("=(B1 + B2) * C1"));
        assert_eq!(cells.get("B2"), None);
        assert_eq!(cells.get("C2"), Some(&CellData::Number(7.0)));
        assert_eq!(cells.addresses(), vec!["A1", "B1", "C1", "A2", "C2"]);
    }

    #[test]
    fn test_header_row_is_skipped() {
        let options = CsvReadOptions {
            has_header: true,
            ..Default::default()
        };
        let cells = read_str("price,qty\n2.5,4\n", &options).unwrap();
        assert_eq!(cells.get("A1"), Some(&CellData::Number(2.5)));
        assert_eq!(cells.get("B1"), Some(&CellData::Number(4.0)));
    }

    #[test]
    fn test_text_cells() {
        let err = read_str("1,hello\n", &CsvReadOptions::default()).unwrap_err();
        match err {
            CsvError::UnsupportedCell { address, content } => {
                assert_eq!(address, "B1");
                assert_eq!(content, "hello");
            }
            other => panic!("unexpected error: {other}"),
        }

        let options = CsvReadOptions {
            text_cells: TextCells::Skip,
            ..Default::default()
        };
        let cells = read_str("1,hello\n", &options).unwrap();
        assert_eq!(cells.len(), 1);
    }

    #[test]
    fn test_delimiter_and_quotes() {
        let options = CsvReadOptions {
            delimiter: b';',
            ..Default::default()
        };
        let cells = read_str("\"=SUM(1, 2)\";3\n", &options).unwrap();
        assert_eq!(cells.raw_content("A1").as_deref(), Some("=SUM(1, 2)"));
        assert_eq!(cells.get("B1"), Some(&CellData::Number(3.0)));
    }

    #[test]
    fn test_read_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10,=A1 * 2").unwrap();
        file.flush().unwrap();

        let cells = CsvReader::read_file(file.path(), &CsvReadOptions::default()).unwrap();
        assert_eq!(cells.raw_content("A1").as_deref(), Some("10"));
        assert_eq!(cells.raw_content("B1").as_deref(), Some("=A1 * 2"));
    }

    #[test]
    fn test_missing_file() {
        let result = CsvReader::read_file("/nonexistent/grid.csv", &CsvReadOptions::default());
        assert!(matches!(result, Err(CsvError::Io(_))));
    }
}
