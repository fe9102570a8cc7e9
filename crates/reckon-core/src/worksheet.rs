//! Worksheet type

use ahash::AHashMap;

use crate::address::CellAddress;
use crate::content::CellContent;
use crate::error::{Error, Result};
use crate::MAX_SHEET_NAME_LEN;

/// A worksheet (single sheet in a workbook)
#[derive(Debug, Default)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Sparse cell storage, keyed by (row, col)
    cells: AHashMap<(u32, u16), CellContent>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        validate_sheet_name(&name)?;
        Ok(Self {
            name,
            cells: AHashMap::new(),
        })
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the sheet
    pub fn set_name<S: Into<String>>(&mut self, name: S) -> Result<()> {
        let name = name.into();
        validate_sheet_name(&name)?;
        self.name = name;
        Ok(())
    }

    // === Cell access ===

    /// Content of a cell by row and column indices
    ///
    /// `CellContent::Blank` when nothing is stored there.
    pub fn content_at(&self, row: u32, col: u16) -> CellContent {
        self.cells
            .get(&(row, col))
            .cloned()
            .unwrap_or(CellContent::Blank)
    }

    /// Content of a cell by address string (e.g. "A1")
    pub fn content(&self, address: &str) -> Result<CellContent> {
        let addr = CellAddress::parse(address)?;
        Ok(self.content_at(addr.row, addr.col))
    }

    // === Cell modification ===

    /// Set a cell's content by row and column indices
    pub fn set_content_at(&mut self, row: u32, col: u16, content: CellContent) {
        if content.is_blank() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), content);
        }
    }

    /// Set a cell's content by address string
    pub fn set_content<C: Into<CellContent>>(&mut self, address: &str, content: C) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_content_at(addr.row, addr.col, content.into());
        Ok(())
    }

    /// Store a formula (the text without a leading `=`)
    pub fn set_formula<S: Into<String>>(&mut self, address: &str, formula: S) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_content_at(addr.row, addr.col, CellContent::Formula(formula.into()));
        Ok(())
    }

    /// Clear a cell
    pub fn clear_cell(&mut self, address: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.cells.remove(&(addr.row, addr.col));
        Ok(())
    }

    /// Number of non-blank cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Iterate over non-blank cells in unspecified order
    pub fn cells(&self) -> impl Iterator<Item = (u32, u16, &CellContent)> {
        self.cells.iter().map(|(&(r, c), v)| (r, c, v))
    }

    /// Upper bound `(rows, cols)` on the occupied area: every cell at
    /// or beyond either bound is blank
    pub fn used_extent(&self) -> (u32, u16) {
        let mut rows = 0u32;
        let mut cols = 0u16;
        for &(r, c) in self.cells.keys() {
            rows = rows.max(r + 1);
            cols = cols.max(c + 1);
        }
        (rows, cols)
    }
}

/// Validate a sheet name against the usual format limits
fn validate_sheet_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(Error::InvalidSheetName(name.to_string()));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(Error::InvalidSheetName(name.to_string()));
    }
    if name.chars().any(|c| matches!(c, ':' | '\\' | '/' | '?' | '*' | '[' | ']')) {
        return Err(Error::InvalidSheetName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut ws = Worksheet::new("Sheet1").unwrap();
        ws.set_content("A1", 42.0).unwrap();
        ws.set_content("B2", "hello").unwrap();
        assert_eq!(ws.content("A1").unwrap(), CellContent::Number(42.0));
        assert_eq!(
            ws.content("B2").unwrap(),
            CellContent::Text("hello".to_string())
        );
        assert_eq!(ws.content("C3").unwrap(), CellContent::Blank);
        assert_eq!(ws.cell_count(), 2);
    }

    #[test]
    fn test_blank_removes_storage() {
        let mut ws = Worksheet::new("Sheet1").unwrap();
        ws.set_content("A1", 1.0).unwrap();
        ws.set_content_at(0, 0, CellContent::Blank);
        assert_eq!(ws.cell_count(), 0);
    }

    #[test]
    fn test_formula_storage() {
        let mut ws = Worksheet::new("Sheet1").unwrap();
        ws.set_formula("A1", "B1+1").unwrap();
        assert_eq!(
            ws.content("A1").unwrap(),
            CellContent::Formula("B1+1".to_string())
        );
    }

    #[test]
    fn test_sheet_name_validation() {
        assert!(Worksheet::new("").is_err());
        assert!(Worksheet::new("a".repeat(32)).is_err());
        assert!(Worksheet::new("Bad:Name").is_err());
        assert!(Worksheet::new("'Quoted").is_err());
        assert!(Worksheet::new("O'Brien Data").is_ok());
    }
}
