//! A1-style cell addresses

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use lazy_regex::regex_captures;
use std::fmt;
use std::str::FromStr;

/// A cell position on the grid
///
/// The formula engine treats addresses as opaque strings. This type is used where
/// a position matters: building addresses from grid coordinates and normalizing
/// user-written references before a store lookup. Absolute markers are accepted
/// when parsing and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Row index (0-based)
    pub row: u32,
    /// Column index (0-based, A=0, XFD=16383)
    pub col: u16,
}

impl CellAddress {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse A1-style notation
    ///
    /// Column letters are case-insensitive and either part may carry a `$` marker.
    ///
    /// # Examples
    /// ```
    /// use calc_tree_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("B4").unwrap();
    /// assert_eq!((addr.row, addr.col), (3, 1));
    ///
    /// let addr = CellAddress::parse("$aa$10").unwrap();
    /// assert_eq!(addr.to_a1_string(), "AA10");
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let Some((_, letters, digits)) = regex_captures!(r"^\$?([A-Za-z]+)\$?([0-9]+)$", s.trim())
        else {
            return Err(Error::InvalidAddress(s.to_string()));
        };

        let col = Self::letters_to_column(letters)?;
        let row = digits
            .parse::<u32>()
            .ok()
            .and_then(|r| r.checked_sub(1))
            .ok_or_else(|| Error::InvalidAddress(s.to_string()))?;
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }

        Ok(Self::new(row, col))
    }

    /// Column letters for a 0-based index (0 = A, 26 = AA)
    pub fn column_to_letters(col: u16) -> String {
        let mut remaining = u32::from(col) + 1;
        let mut letters = String::new();
        while remaining > 0 {
            let digit = (remaining - 1) % 26;
            letters.insert(0, char::from(b'A' + digit as u8));
            remaining = (remaining - 1) / 26;
        }
        letters
    }

    /// 0-based index for column letters, case-insensitive
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        let col = letters.bytes().try_fold(0u32, |acc, b| {
            if !b.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(letters.to_string()));
            }
            let next = acc * 26 + u32::from(b.to_ascii_uppercase() - b'A') + 1;
            if next > u32::from(MAX_COLS) {
                return Err(Error::ColumnOutOfBounds(u16::MAX, MAX_COLS - 1));
            }
            Ok(next)
        })?;

        match col.checked_sub(1) {
            Some(index) => Ok(index as u16),
            None => Err(Error::InvalidAddress(letters.to_string())),
        }
    }

    /// Format as a plain A1 string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", Self::column_to_letters(self.col), self.row + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
