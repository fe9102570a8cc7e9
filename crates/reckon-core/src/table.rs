//! Table definitions for structured references
//!
//! A table anchors a rectangular range on one sheet, names its columns,
//! and optionally reserves header/totals rows. Structured references
//! like `Sales[[#Totals],[Amount]]` resolve against this metadata.

use crate::address::CellRange;

/// A table (list object) defined in the document
#[derive(Debug, Clone)]
pub struct Table {
    /// Table name, unique in the workbook, case-insensitive
    pub name: String,
    /// Sheet the table lives on
    pub sheet: u32,
    /// Full extent of the table, headers and totals included
    pub range: CellRange,
    /// Column names, left to right; length matches the range width
    pub columns: Vec<String>,
    /// Number of header rows at the top of the range (usually 0 or 1)
    pub header_rows: u32,
    /// Number of totals rows at the bottom of the range (usually 0 or 1)
    pub totals_rows: u32,
}

impl Table {
    /// Create a table with one header row and no totals row
    pub fn new(
        name: impl Into<String>,
        sheet: u32,
        range: CellRange,
        columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            sheet,
            range,
            columns,
            header_rows: 1,
            totals_rows: 0,
        }
    }

    /// Set the number of totals rows
    pub fn with_totals_rows(mut self, totals_rows: u32) -> Self {
        self.totals_rows = totals_rows;
        self
    }

    /// Set the number of header rows
    pub fn with_header_rows(mut self, header_rows: u32) -> Self {
        self.header_rows = header_rows;
        self
    }

    /// Column index (0-based, relative to the table) by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Absolute column index of a table column
    pub fn column_at(&self, table_col: usize) -> u16 {
        self.range.start.col + table_col as u16
    }

    /// Row span of the header region, if any
    pub fn header_span(&self) -> Option<(u32, u32)> {
        if self.header_rows == 0 {
            return None;
        }
        let first = self.range.start.row;
        Some((first, first + self.header_rows - 1))
    }

    /// Row span of the totals region, if any
    pub fn totals_span(&self) -> Option<(u32, u32)> {
        if self.totals_rows == 0 {
            return None;
        }
        let last = self.range.end.row;
        Some((last - (self.totals_rows - 1), last))
    }

    /// Row span of the data region (between headers and totals)
    ///
    /// `None` when headers plus totals consume the whole range.
    pub fn data_span(&self) -> Option<(u32, u32)> {
        let first = self.range.start.row + self.header_rows;
        let last_plus_one = self.range.end.row + 1 - self.totals_rows;
        if first >= last_plus_one {
            return None;
        }
        Some((first, last_plus_one - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::CellRange;

    fn sample() -> Table {
        // B2:D6 with one header row and one totals row
        Table::new(
            "Sales",
            0,
            CellRange::parse("B2:D6").unwrap(),
            vec!["Region".into(), "Units".into(), "Amount".into()],
        )
        .with_totals_rows(1)
    }

    #[test]
    fn test_column_lookup() {
        let t = sample();
        assert_eq!(t.column_index("Amount"), Some(2));
        assert_eq!(t.column_index("amount"), Some(2));
        assert_eq!(t.column_index("Missing"), None);
        assert_eq!(t.column_at(2), 3); // column D
    }

    #[test]
    fn test_region_spans() {
        let t = sample();
        assert_eq!(t.header_span(), Some((1, 1)));
        assert_eq!(t.data_span(), Some((2, 4)));
        assert_eq!(t.totals_span(), Some((5, 5)));
    }

    #[test]
    fn test_no_totals() {
        let t = Table::new(
            "T",
            0,
            CellRange::parse("A1:B3").unwrap(),
            vec!["X".into(), "Y".into()],
        );
        assert_eq!(t.totals_span(), None);
        assert_eq!(t.data_span(), Some((1, 2)));
    }
}
