//! Read-only document traits used by the formula engine
//!
//! The engine never depends on a concrete workbook type. Parsing needs
//! name and sheet lookups ([`NamingEnvironment`]); evaluation needs cell
//! contents ([`DocumentView`]). [`crate::Workbook`] implements both.

use crate::address::CellRange;
use crate::content::CellContent;
use crate::table::Table;

/// Read access to cell contents during evaluation
pub trait DocumentView {
    /// Number of sheets in the document
    fn sheet_count(&self) -> u32;

    /// Content of a cell; `CellContent::Blank` when the cell is empty
    /// or the coordinates fall outside the stored state
    fn cell_content(&self, sheet: u32, row: u32, col: u16) -> CellContent;

    /// Upper bound `(rows, cols)` on the occupied part of a sheet:
    /// every cell at or beyond either bound is blank. Lets whole-row
    /// and whole-column references iterate only the populated extent.
    ///
    /// The default claims the entire sheet may be occupied.
    fn used_extent(&self, _sheet: u32) -> (u32, u16) {
        (crate::MAX_ROWS, crate::MAX_COLS)
    }
}

/// Name, sheet, and table lookups used while parsing and rendering
pub trait NamingEnvironment {
    /// Sheet index by name, case-insensitive
    fn sheet_index_of(&self, name: &str) -> Option<u32>;

    /// Sheet name by index
    fn sheet_name(&self, sheet: u32) -> Option<&str>;

    /// Defined-name lookup; sheet-scoped names shadow workbook scope.
    ///
    /// `scope_sheet` is the sheet the formula lives on.
    fn name_refers_to(&self, name: &str, scope_sheet: u32) -> Option<&str>;

    /// Table lookup by name, case-insensitive
    fn table(&self, name: &str) -> Option<&Table>;

    /// Range a defined name resolves to, when it names a plain range.
    ///
    /// Used by structured-reference resolution and by hosts that want
    /// name targets without invoking the parser. Default: none.
    fn name_range(&self, _name: &str, _scope_sheet: u32) -> Option<(u32, CellRange)> {
        None
    }
}
