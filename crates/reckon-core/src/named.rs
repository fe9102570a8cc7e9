//! Defined name (named range) storage
//!
//! Defined names map a user-visible name to a reference or formula,
//! stored as text the engine re-parses on demand:
//!
//! - `Sheet1!$A$1` - single cell
//! - `Sheet1!$A$1:$D$10` - range
//! - `0.0725` - constant
//! - `=SUM(Sales)` - formula

/// Scope of a defined name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope {
    /// Available throughout the workbook (global)
    Workbook,
    /// Scoped to a specific sheet (local)
    Sheet(u32),
}

/// A defined name
///
/// Names are case-insensitive; lookups go through
/// [`NamingEnvironment::name_refers_to`](crate::view::NamingEnvironment::name_refers_to),
/// which prefers a sheet-scoped name over a workbook-scoped one.
#[derive(Debug, Clone)]
pub struct NamedRange {
    /// The name (e.g., "SalesData", "TaxRate")
    pub name: String,
    /// Scope of this name
    pub scope: NameScope,
    /// What the name refers to, as reference/formula text
    pub refers_to: String,
}

impl NamedRange {
    /// Create a new defined name
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>, scope: NameScope) -> Self {
        Self {
            name: name.into(),
            scope,
            refers_to: refers_to.into(),
        }
    }

    /// Create a workbook-scoped name
    pub fn workbook_scope(name: impl Into<String>, refers_to: impl Into<String>) -> Self {
        Self::new(name, refers_to, NameScope::Workbook)
    }

    /// Create a sheet-scoped name
    pub fn sheet_scope(
        name: impl Into<String>,
        refers_to: impl Into<String>,
        sheet: u32,
    ) -> Self {
        Self::new(name, refers_to, NameScope::Sheet(sheet))
    }

    /// Whether this name is visible from the given sheet
    pub fn visible_from(&self, sheet: Option<u32>) -> bool {
        match self.scope {
            NameScope::Workbook => true,
            NameScope::Sheet(s) => sheet == Some(s),
        }
    }
}
