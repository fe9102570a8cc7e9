//! # reckon-core
//!
//! Document-side data model for the reckon formula engine.
//!
//! This crate provides the types the engine consumes but never owns:
//! - [`CellAddress`], [`CellRange`], [`CellCoord`] - cell addressing
//! - [`CellContent`] and [`CellError`] - what a cell holds
//! - [`DocumentView`] and [`NamingEnvironment`] - the read surface the
//!   engine evaluates against
//! - [`Workbook`], [`Worksheet`] - an in-memory document implementing
//!   both traits, used by hosts without their own storage and by tests
//!
//! ## Example
//!
//! ```rust
//! use reckon_core::{Workbook, CellContent};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_content("A1", CellContent::Number(42.0)).unwrap();
//! sheet.set_formula("B1", "A1*2").unwrap();
//! ```

pub mod address;
pub mod content;
pub mod error;
pub mod named;
pub mod table;
pub mod view;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use address::{CellAddress, CellCoord, CellRange};
pub use content::{CellContent, CellError};
pub use error::{Error, Result};
pub use named::{NameScope, NamedRange};
pub use table::Table;
pub use view::{DocumentView, NamingEnvironment};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
