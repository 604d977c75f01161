use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CellAddressError {
    #[error("empty cell address")]
    Empty,
    #[error("malformed cell address {0:?}, expected A1 notation")]
    Malformed(String),
    #[error("cell address {0:?} is out of range")]
    OutOfRange(String),
}

/// A single cell in A1 notation. Column and row are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellAddress {
    column: u32,
    row: u32,
}

impl CellAddress {
    /// Returns `None` for a zero column or row.
    pub fn new(column: u32, row: u32) -> Option<Self> {
        (column > 0 && row > 0).then_some(Self { column, row })
    }

    pub(crate) const fn from_parts(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn offset(&self, columns: u32, rows: u32) -> Option<Self> {
        Some(Self {
            column: self.column.checked_add(columns)?,
            row: self.row.checked_add(rows)?,
        })
    }
}

impl FromStr for CellAddress {
    type Err = CellAddressError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let text = input.trim();
        if text.is_empty() {
            return Err(CellAddressError::Empty);
        }
        let split = text
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| CellAddressError::Malformed(text.to_string()))?;
        let (letters, digits) = text.split_at(split);
        if letters.is_empty()
            || !letters.chars().all(|c| c.is_ascii_alphabetic())
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(CellAddressError::Malformed(text.to_string()));
        }

        let mut column: u32 = 0;
        for c in letters.chars() {
            let value = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
            column = column
                .checked_mul(26)
                .and_then(|v| v.checked_add(value))
                .ok_or_else(|| CellAddressError::OutOfRange(text.to_string()))?;
        }
        let row: u32 = digits
            .parse()
            .map_err(|_| CellAddressError::OutOfRange(text.to_string()))?;

        Self::new(column, row).ok_or_else(|| CellAddressError::Malformed(text.to_string()))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.column), self.row)
    }
}

fn column_letters(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Rectangular block between two corner cells, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// Block of `width` x `height` cells whose top-left corner is `anchor`.
    pub fn from_anchor(anchor: CellAddress, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let end = anchor.offset(width - 1, height - 1)?;
        Some(Self { start: anchor, end })
    }

    pub fn contains(&self, cell: CellAddress) -> bool {
        (self.start.column..=self.end.column).contains(&cell.column)
            && (self.start.row..=self.end.row).contains(&cell.row)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
