//! Cell address, range, and coordinate types

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g., "A1", "$B$2")
///
/// Addresses combine column letters (A-XFD) with 1-based row numbers in
/// display form; internally both components are 0-based. The optional `$`
/// marker makes a component absolute, which matters to the reference
/// shifter: absolute components survive copy-style translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., XFD=16383)
    pub col: u16,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a new cell address with relative references
    pub fn new(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Create a new cell address with specified absolute/relative flags
    pub fn with_absolute(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Create an absolute cell address ($A$1 style)
    pub fn absolute(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: true,
            col_absolute: true,
        }
    }

    /// Parse a cell address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use reckon_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("A1").unwrap();
    /// assert_eq!(addr.row, 0);
    /// assert_eq!(addr.col, 0);
    ///
    /// let addr = CellAddress::parse("$B$2").unwrap();
    /// assert!(addr.row_absolute);
    /// assert!(addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;

        let col_absolute = if bytes.get(pos) == Some(&b'$') {
            pos += 1;
            true
        } else {
            false
        };

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }

        if pos == col_start {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }

        let col = Self::letters_to_column(&s[col_start..pos])?;

        let row_absolute = if bytes.get(pos) == Some(&b'$') {
            pos += 1;
            true
        } else {
            false
        };

        let row_str = &s[pos..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }

        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        // Rows are 1-based in display form
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }

        let row = row - 1;

        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }

        Ok(Self {
            row,
            col,
            row_absolute,
            col_absolute,
        })
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u16) -> String {
        let mut result = String::new();
        let mut n = col as u32 + 1; // 1-based for calculation

        while n > 0 {
            n -= 1;
            let c = ((n % 26) as u8 + b'A') as char;
            result.insert(0, c);
            n /= 26;
        }

        result
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            // Bail as soon as the 1-based accumulator passes the last
            // column; long letter runs would otherwise overflow u32
            if col > MAX_COLS as u32 {
                return Err(Error::ColumnOutOfBounds(u16::MAX, MAX_COLS - 1));
            }
        }

        Ok((col - 1) as u16) // Convert to 0-based
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        let mut result = String::new();

        if self.col_absolute {
            result.push('$');
        }
        result.push_str(&Self::column_to_letters(self.col));

        if self.row_absolute {
            result.push('$');
        }
        result.push_str(&(self.row + 1).to_string());

        result
    }

    /// Create a range from this address to another
    pub fn to(&self, other: CellAddress) -> CellRange {
        CellRange::new(*self, other)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular range of cells (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Start address (top-left)
    pub start: CellAddress,
    /// End address (bottom-right)
    pub end: CellAddress,
}

impl CellRange {
    /// Create a new cell range, normalized so start is top-left
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        let (start_row, start_row_abs, end_row, end_row_abs) = if start.row <= end.row {
            (start.row, start.row_absolute, end.row, end.row_absolute)
        } else {
            (end.row, end.row_absolute, start.row, start.row_absolute)
        };

        let (start_col, start_col_abs, end_col, end_col_abs) = if start.col <= end.col {
            (start.col, start.col_absolute, end.col, end.col_absolute)
        } else {
            (end.col, end.col_absolute, start.col, start.col_absolute)
        };

        Self {
            start: CellAddress::with_absolute(start_row, start_col, start_row_abs, start_col_abs),
            end: CellAddress::with_absolute(end_row, end_col, end_row_abs, end_col_abs),
        }
    }

    /// A range covering whole columns (`A:B` style)
    pub fn whole_columns(first_col: u16, last_col: u16) -> Self {
        Self::new(
            CellAddress::new(0, first_col),
            CellAddress::new(MAX_ROWS - 1, last_col),
        )
    }

    /// A range covering whole rows (`1:3` style)
    pub fn whole_rows(first_row: u32, last_row: u32) -> Self {
        Self::new(
            CellAddress::new(first_row, 0),
            CellAddress::new(last_row, MAX_COLS - 1),
        )
    }

    /// Parse a range from A1-style notation ("A1:B10" or a single "A1")
    pub fn parse(s: &str) -> Result<Self> {
        match s.find(':') {
            Some(pos) => {
                let start = CellAddress::parse(&s[..pos])?;
                let end = CellAddress::parse(&s[pos + 1..])?;
                Ok(Self::new(start, end))
            }
            None => {
                let addr = CellAddress::parse(s)?;
                Ok(Self::new(addr, addr))
            }
        }
    }

    /// Number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Whether the range is a single cell
    pub fn is_single_cell(&self) -> bool {
        self.start.row == self.end.row && self.start.col == self.end.col
    }

    /// Whether the range spans every row (a whole-column reference)
    pub fn is_whole_columns(&self) -> bool {
        self.start.row == 0 && self.end.row == MAX_ROWS - 1
    }

    /// Whether the range spans every column (a whole-row reference)
    pub fn is_whole_rows(&self) -> bool {
        self.start.col == 0 && self.end.col == MAX_COLS - 1
    }

    /// Whether the range contains the given row/column
    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.start.row && row <= self.end.row && col >= self.start.col && col <= self.end.col
    }

    /// Intersection with another range, if any
    pub fn intersect(&self, other: &CellRange) -> Option<CellRange> {
        let first_row = self.start.row.max(other.start.row);
        let last_row = self.end.row.min(other.end.row);
        let first_col = self.start.col.max(other.start.col);
        let last_col = self.end.col.min(other.end.col);

        if first_row > last_row || first_col > last_col {
            return None;
        }

        Some(CellRange::new(
            CellAddress::new(first_row, first_col),
            CellAddress::new(last_row, last_col),
        ))
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        if self.is_single_cell() {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start.to_a1_string(), self.end.to_a1_string())
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

/// Absolute coordinate of one cell in a document: sheet index plus
/// 0-based row/column. Used as the key for cached evaluation results
/// and the dependency index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub sheet: u32,
    pub row: u32,
    pub col: u16,
}

impl CellCoord {
    /// Create a new coordinate
    pub fn new(sheet: u32, row: u32, col: u16) -> Self {
        Self { sheet, row, col }
    }

    /// The coordinate's address part, with relative flags
    pub fn address(&self) -> CellAddress {
        CellAddress::new(self.row, self.col)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}!{}", self.sheet, self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_address() {
        let addr = CellAddress::parse("A1").unwrap();
        assert_eq!(addr.row, 0);
        assert_eq!(addr.col, 0);
        assert!(!addr.row_absolute);
        assert!(!addr.col_absolute);

        let addr = CellAddress::parse("C10").unwrap();
        assert_eq!(addr.row, 9);
        assert_eq!(addr.col, 2);
    }

    #[test]
    fn test_parse_absolute_address() {
        let addr = CellAddress::parse("$B$2").unwrap();
        assert_eq!(addr.row, 1);
        assert_eq!(addr.col, 1);
        assert!(addr.row_absolute);
        assert!(addr.col_absolute);

        let addr = CellAddress::parse("$D7").unwrap();
        assert!(addr.col_absolute);
        assert!(!addr.row_absolute);
    }

    #[test]
    fn test_parse_invalid_address() {
        assert!(CellAddress::parse("").is_err());
        assert!(CellAddress::parse("123").is_err());
        assert!(CellAddress::parse("ABC").is_err());
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("A1048577").is_err());
        assert!(CellAddress::parse("XFE1").is_err());
    }

    #[test]
    fn test_long_letter_runs_are_rejected_not_wrapped() {
        // Identifiers like ZZZZZZZ1 reach the address parser before
        // falling back to name lookup; the accumulator must reject
        // them instead of overflowing
        assert!(matches!(
            CellAddress::letters_to_column("ZZZZZZZ"),
            Err(Error::ColumnOutOfBounds(..))
        ));
        assert!(matches!(
            CellAddress::letters_to_column("AAAAAAAAAAAAAAAA"),
            Err(Error::ColumnOutOfBounds(..))
        ));
        assert!(CellAddress::parse("ZZZZZZZ1").is_err());
        // The last real column still parses
        assert_eq!(CellAddress::letters_to_column("XFD").unwrap(), MAX_COLS - 1);
    }

    #[test]
    fn test_column_letters_round_trip() {
        for col in [0u16, 1, 25, 26, 27, 701, 702, MAX_COLS - 1] {
            let letters = CellAddress::column_to_letters(col);
            assert_eq!(CellAddress::letters_to_column(&letters).unwrap(), col);
        }
        assert_eq!(CellAddress::column_to_letters(0), "A");
        assert_eq!(CellAddress::column_to_letters(25), "Z");
        assert_eq!(CellAddress::column_to_letters(26), "AA");
        assert_eq!(CellAddress::column_to_letters(MAX_COLS - 1), "XFD");
    }

    #[test]
    fn test_to_a1_string() {
        assert_eq!(CellAddress::new(0, 0).to_a1_string(), "A1");
        assert_eq!(CellAddress::absolute(1, 1).to_a1_string(), "$B$2");
        assert_eq!(
            CellAddress::with_absolute(6, 3, true, false).to_a1_string(),
            "D$7"
        );
    }

    #[test]
    fn test_range_normalization() {
        let range = CellRange::new(CellAddress::new(9, 1), CellAddress::new(0, 0));
        assert_eq!(range.start.row, 0);
        assert_eq!(range.start.col, 0);
        assert_eq!(range.end.row, 9);
        assert_eq!(range.end.col, 1);
    }

    #[test]
    fn test_range_parse() {
        let range = CellRange::parse("A1:B10").unwrap();
        assert_eq!(range.row_count(), 10);
        assert_eq!(range.col_count(), 2);

        let single = CellRange::parse("C3").unwrap();
        assert!(single.is_single_cell());
    }

    #[test]
    fn test_range_intersect() {
        let a = CellRange::parse("A1:C3").unwrap();
        let b = CellRange::parse("B2:D4").unwrap();
        let i = a.intersect(&b).unwrap();
        assert_eq!(i.to_a1_string(), "B2:C3");

        let disjoint = CellRange::parse("E5:F6").unwrap();
        assert!(a.intersect(&disjoint).is_none());
    }

    #[test]
    fn test_whole_rows_and_columns() {
        let cols = CellRange::whole_columns(0, 0);
        assert!(cols.is_whole_columns());
        assert!(!cols.is_whole_rows());

        let rows = CellRange::whole_rows(1, 1);
        assert!(rows.is_whole_rows());
        assert!(rows.contains(1, 100));
        assert!(!rows.contains(2, 0));
    }
}
