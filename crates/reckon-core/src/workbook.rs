//! Workbook type - the main document structure

use crate::address::CellRange;
use crate::content::CellContent;
use crate::error::{Error, Result};
use crate::named::{NameScope, NamedRange};
use crate::table::Table;
use crate::view::{DocumentView, NamingEnvironment};
use crate::worksheet::Worksheet;

/// A workbook (spreadsheet document)
///
/// A workbook contains one or more worksheets, defined names, and
/// tables. It implements [`DocumentView`] and [`NamingEnvironment`],
/// so it can be handed to the formula engine directly.
#[derive(Debug)]
pub struct Workbook {
    /// Worksheets in the workbook
    worksheets: Vec<Worksheet>,
    /// Defined names (named ranges)
    names: Vec<NamedRange>,
    /// Tables, for structured references
    tables: Vec<Table>,
}

impl Workbook {
    /// Create a new empty workbook with one worksheet
    pub fn new() -> Self {
        let mut wb = Self::empty();
        // "Sheet1" always passes validation
        let _ = wb.add_worksheet_with_name("Sheet1");
        wb
    }

    /// Create an empty workbook with no worksheets
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            names: Vec::new(),
            tables: Vec::new(),
        }
    }

    // === Worksheets ===

    /// Get a worksheet by index
    pub fn worksheet(&self, index: u32) -> Option<&Worksheet> {
        self.worksheets.get(index as usize)
    }

    /// Get a mutable worksheet by index
    pub fn worksheet_mut(&mut self, index: u32) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index as usize)
    }

    /// Get a worksheet by name (case-insensitive)
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets
            .iter()
            .find(|ws| ws.name().eq_ignore_ascii_case(name))
    }

    /// Get a mutable worksheet by name (case-insensitive)
    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.worksheets
            .iter_mut()
            .find(|ws| ws.name().eq_ignore_ascii_case(name))
    }

    /// Iterate over all worksheets
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Add a new worksheet with a generated name ("Sheet1", "Sheet2", ...)
    pub fn add_worksheet(&mut self) -> Result<u32> {
        let mut n = self.worksheets.len() + 1;
        loop {
            let name = format!("Sheet{n}");
            if self.worksheet_by_name(&name).is_none() {
                return self.add_worksheet_with_name(&name);
            }
            n += 1;
        }
    }

    /// Add a new worksheet with the specified name
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<u32> {
        if self.worksheet_by_name(name).is_some() {
            return Err(Error::DuplicateSheetName(name.to_string()));
        }
        let index = self.worksheets.len() as u32;
        self.worksheets.push(Worksheet::new(name)?);
        Ok(index)
    }

    // === Defined names ===

    /// Define a name
    ///
    /// Rejects duplicates within the same scope. Names must start with
    /// a letter or underscore and cannot look like a cell address.
    pub fn define_name(&mut self, name: NamedRange) -> Result<()> {
        validate_defined_name(&name.name)?;
        let clash = self
            .names
            .iter()
            .any(|n| n.name.eq_ignore_ascii_case(&name.name) && n.scope == name.scope);
        if clash {
            return Err(Error::InvalidName(name.name));
        }
        self.names.push(name);
        Ok(())
    }

    /// Iterate over all defined names
    pub fn names(&self) -> impl Iterator<Item = &NamedRange> {
        self.names.iter()
    }

    // === Tables ===

    /// Add a table
    pub fn add_table(&mut self, table: Table) -> Result<()> {
        validate_defined_name(&table.name)?;
        if self
            .tables
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(&table.name))
        {
            return Err(Error::DuplicateTableName(table.name));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Iterate over all tables
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentView for Workbook {
    fn sheet_count(&self) -> u32 {
        self.worksheets.len() as u32
    }

    fn cell_content(&self, sheet: u32, row: u32, col: u16) -> CellContent {
        self.worksheet(sheet)
            .map(|ws| ws.content_at(row, col))
            .unwrap_or(CellContent::Blank)
    }

    fn used_extent(&self, sheet: u32) -> (u32, u16) {
        self.worksheet(sheet).map_or((0, 0), |ws| ws.used_extent())
    }
}

impl NamingEnvironment for Workbook {
    fn sheet_index_of(&self, name: &str) -> Option<u32> {
        self.worksheets
            .iter()
            .position(|ws| ws.name().eq_ignore_ascii_case(name))
            .map(|i| i as u32)
    }

    fn sheet_name(&self, sheet: u32) -> Option<&str> {
        self.worksheet(sheet).map(|ws| ws.name())
    }

    fn name_refers_to(&self, name: &str, scope_sheet: u32) -> Option<&str> {
        // Sheet-scoped names shadow workbook-scoped ones
        let local = self.names.iter().find(|n| {
            n.name.eq_ignore_ascii_case(name) && n.scope == NameScope::Sheet(scope_sheet)
        });
        let found = local.or_else(|| {
            self.names
                .iter()
                .find(|n| n.name.eq_ignore_ascii_case(name) && n.scope == NameScope::Workbook)
        });
        found.map(|n| n.refers_to.as_str())
    }

    fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    fn name_range(&self, name: &str, scope_sheet: u32) -> Option<(u32, CellRange)> {
        let text = self.name_refers_to(name, scope_sheet)?;
        let (sheet_part, range_part) = text.rsplit_once('!')?;
        let sheet_name = sheet_part.trim_matches('\'');
        let sheet = self.sheet_index_of(sheet_name)?;
        let range = CellRange::parse(range_part).ok()?;
        Some((sheet, range))
    }
}

/// Validate a defined name or table name
fn validate_defined_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_head = matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '\\');
    let valid_tail = chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if !valid_head || !valid_tail {
        return Err(Error::InvalidName(name.to_string()));
    }
    // A name that parses as a cell address would be unreachable
    if crate::address::CellAddress::parse(name).is_ok() {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_workbook_has_one_sheet() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.sheet_name(0), Some("Sheet1"));
    }

    #[test]
    fn test_sheet_lookup_case_insensitive() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Data").unwrap();
        assert_eq!(wb.sheet_index_of("data"), Some(1));
        assert_eq!(wb.sheet_index_of("DATA"), Some(1));
        assert_eq!(wb.sheet_index_of("Other"), None);
    }

    #[test]
    fn test_duplicate_sheet_name_rejected() {
        let mut wb = Workbook::new();
        assert!(wb.add_worksheet_with_name("sheet1").is_err());
    }

    #[test]
    fn test_generated_sheet_names() {
        let mut wb = Workbook::new();
        let idx = wb.add_worksheet().unwrap();
        assert_eq!(wb.sheet_name(idx), Some("Sheet2"));
    }

    #[test]
    fn test_cell_content_via_view() {
        let mut wb = Workbook::new();
        wb.worksheet_mut(0).unwrap().set_content("A1", 5.0).unwrap();
        assert_eq!(wb.cell_content(0, 0, 0), CellContent::Number(5.0));
        assert_eq!(wb.cell_content(0, 5, 5), CellContent::Blank);
        assert_eq!(wb.cell_content(9, 0, 0), CellContent::Blank);
    }

    #[test]
    fn test_name_scoping() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Data").unwrap();
        wb.define_name(NamedRange::workbook_scope("Rate", "0.05"))
            .unwrap();
        wb.define_name(NamedRange::sheet_scope("Rate", "0.07", 1))
            .unwrap();
        assert_eq!(wb.name_refers_to("Rate", 0), Some("0.05"));
        assert_eq!(wb.name_refers_to("rate", 1), Some("0.07"));
    }

    #[test]
    fn test_name_validation() {
        let mut wb = Workbook::new();
        assert!(wb
            .define_name(NamedRange::workbook_scope("A1", "Sheet1!$B$1"))
            .is_err());
        assert!(wb
            .define_name(NamedRange::workbook_scope("1Rate", "0.05"))
            .is_err());
        assert!(wb
            .define_name(NamedRange::workbook_scope("Tax.Rate", "0.05"))
            .is_ok());
    }

    #[test]
    fn test_name_range_resolution() {
        let mut wb = Workbook::new();
        wb.define_name(NamedRange::workbook_scope("Data", "Sheet1!$A$1:$B$3"))
            .unwrap();
        let (sheet, range) = wb.name_range("Data", 0).unwrap();
        assert_eq!(sheet, 0);
        assert_eq!(range, CellRange::parse("$A$1:$B$3").unwrap());
    }

    #[test]
    fn test_tables() {
        let mut wb = Workbook::new();
        let table = Table::new(
            "Sales",
            0,
            CellRange::parse("A1:C5").unwrap(),
            vec!["Region".into(), "Units".into(), "Amount".into()],
        );
        wb.add_table(table).unwrap();
        assert!(wb.table("sales").is_some());
        let dup = Table::new("SALES", 0, CellRange::parse("E1:F2").unwrap(), vec![]);
        assert!(wb.add_table(dup).is_err());
    }
}
