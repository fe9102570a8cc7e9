//! # reckon-formula
//!
//! Formula engine for reckon workbooks.
//!
//! This crate provides:
//! - Formula parsing (text → token program)
//! - Rendering programs back to canonical formula text
//! - Reference shifting for row/column edits and shared-formula templates
//! - Demand-driven evaluation with cycle detection and a dependency cache
//! - Built-in worksheet functions
//! - Cross-workbook reference resolution via a linker
//!
//! ## Example
//!
//! ```rust,ignore
//! use reckon_formula::{parse, Engine};
//!
//! let engine = Engine::new(&workbook, &workbook);
//! let value = engine.evaluate("=SUM(A1:A10)*2", origin)?;
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod linker;
pub mod parser;
pub mod render;
pub mod shared;
pub mod shift;
pub mod token;
pub mod value;

pub use cache::DependencyCache;
pub use engine::Engine;
pub use error::{EvalError, EvalResult, ParseError, ParseResult};
pub use evaluator::{FunctionContext, Operand};
pub use functions::{builtin, FunctionDef, FunctionImpl, FunctionRegistry};
pub use linker::WorkbookLinker;
pub use parser::{parse, parse_array};
pub use render::render;
pub use shared::SharedFormulaTemplate;
pub use shift::{shift, Axis, Shift, ShiftMode};
pub use token::{
    AreaRef, BinaryOp, CellRef, FormulaKind, ParsedFormula, TableRegion, TableSelector, Token,
    UnaryOp,
};
pub use value::Value;
