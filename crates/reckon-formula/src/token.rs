//! Token model
//!
//! A parsed formula is an ordered token sequence read left to right as
//! RPN: operands push, operators and functions pop their arity and push
//! one result. A well-formed program leaves exactly one operand on the
//! stack.

use reckon_core::{CellAddress, CellError, CellRange};

/// Binary operators, in evaluation form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `:` between two evaluated references (e.g. `A1:B2` built from
    /// sub-expressions; plain literal ranges become [`Token::Area`])
    Range,
    /// `,` between references inside parentheses
    Union,
    /// Whitespace between two references
    Intersect,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Prefix `-`
    Neg,
    /// Prefix `+` (kept for faithful re-rendering)
    Plus,
    /// Postfix `%`
    Percent,
}

/// A single-cell reference, optionally sheet-qualified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    /// Resolved sheet index; `None` means the formula's own sheet
    pub sheet: Option<u32>,
    pub addr: CellAddress,
}

/// A rectangular area reference, optionally sheet-qualified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaRef {
    /// Resolved sheet index; `None` means the formula's own sheet
    pub sheet: Option<u32>,
    pub range: CellRange,
}

/// Region keyword inside a structured reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRegion {
    /// `[#All]` - headers, data, and totals
    All,
    /// `[#Data]` - the default when no region is given
    Data,
    /// `[#Headers]`
    Headers,
    /// `[#Totals]`
    Totals,
    /// `[#This Row]` or the `@` shorthand
    ThisRow,
}

/// Parsed selector of a structured reference: an optional region plus
/// an optional column or column span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSelector {
    pub region: Option<TableRegion>,
    /// `(first, None)` for one column, `(first, Some(last))` for a span
    pub columns: Option<(String, Option<String>)>,
}

impl TableSelector {
    /// Selector covering the whole data region (`Tbl` used bare is not
    /// valid formula syntax, but `Tbl[]` is)
    pub fn data() -> Self {
        Self {
            region: None,
            columns: None,
        }
    }
}

/// One element of a token program
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    Text(String),
    Bool(bool),
    Err(CellError),
    /// An omitted argument, e.g. the second slot in `IF(A1,,2)`
    MissingArg,

    // References
    Ref(CellRef),
    Area(AreaRef),
    /// 3-D single cell: `Sheet1:Sheet3!A1`
    Ref3d {
        first_sheet: u32,
        last_sheet: u32,
        addr: CellAddress,
    },
    /// 3-D area: `Sheet1:Sheet3!A1:B2`
    Area3d {
        first_sheet: u32,
        last_sheet: u32,
        range: CellRange,
    },
    /// External-workbook cell: `[1]Sheet1!A1`. The sheet stays textual
    /// because it belongs to another document's namespace.
    ExternRef {
        workbook: u32,
        sheet: String,
        addr: CellAddress,
    },
    /// External-workbook area: `[1]Sheet1!A1:B2`
    ExternArea {
        workbook: u32,
        sheet: String,
        range: CellRange,
    },
    /// A defined name, resolved against the naming environment at
    /// evaluation time
    Name(String),
    /// An external-workbook name: `[1]!GlobalName`
    NameX { workbook: u32, name: String },
    /// A structured table reference, resolved against the table at
    /// parse time. Resolution failures (missing totals region,
    /// this-row outside the table) become an error payload, not a
    /// parse failure.
    Structured {
        table: String,
        selector: TableSelector,
        area: Result<AreaRef, CellError>,
    },
    /// A reference destroyed by a structural edit; renders as `#REF!`
    /// in place of the original cell text
    RefErr,

    // Operators and calls
    Binary(BinaryOp),
    Unary(UnaryOp),
    Func { name: String, argc: u8 },
    /// Render-only grouping marker: wraps the preceding sub-expression
    /// in parentheses
    Paren,

    /// Inline array literal `{1,2;3,4}`; `values` holds rows*cols
    /// literal tokens in row-major order
    ArrayLit {
        rows: u32,
        cols: u16,
        values: Vec<Token>,
    },

    // Short-circuit control (ignored by the renderer, transparent in
    // array context)
    /// Pops the condition. True: fall through into the true branch.
    /// False: jump over `n` tokens to the false branch. Error: push it
    /// and jump `n - 1` tokens, landing on the trailing [`Token::Skip`]
    /// which exits the call.
    SkipIfFalse(u16),
    /// Unconditional jump over `n` tokens; converts a top-of-stack
    /// missing operand into a blank
    Skip(u16),
}

impl Token {
    /// Whether this token pushes a dereferenceable reference operand
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Token::Ref(_)
                | Token::Area(_)
                | Token::Ref3d { .. }
                | Token::Area3d { .. }
                | Token::ExternRef { .. }
                | Token::ExternArea { .. }
                | Token::Name(_)
                | Token::NameX { .. }
                | Token::Structured { .. }
        )
    }
}

/// Declared type of a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaKind {
    /// Ordinary cell formula producing one scalar
    Cell,
    /// Array formula targeting a `rows` x `cols` output rectangle
    Array { rows: u32, cols: u16 },
}

/// A parsed formula: the token program plus its declared type
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFormula {
    pub tokens: Vec<Token>,
    pub kind: FormulaKind,
}

impl ParsedFormula {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            kind: FormulaKind::Cell,
        }
    }

    pub fn array(tokens: Vec<Token>, rows: u32, cols: u16) -> Self {
        Self {
            tokens,
            kind: FormulaKind::Array { rows, cols },
        }
    }

    /// Iterate over the program's reference tokens
    pub fn references(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.is_reference())
    }
}
