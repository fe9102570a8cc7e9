//! Cell content and the well-known spreadsheet error codes

use std::fmt;

/// The well-known spreadsheet error codes
///
/// These are first-class evaluation results, not host failures: they
/// propagate through operators and functions exactly like numbers or
/// text. [`CellError::Circular`] is a sentinel produced only by the
/// dependency cache when a cell participates in a reference cycle; it
/// cannot be written in formula text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// #NULL! - intersection of references that do not intersect
    Null,
    /// #DIV/0! - division by zero
    Div0,
    /// #VALUE! - wrong type of operand
    Value,
    /// #REF! - reference to a deleted or invalid cell
    Ref,
    /// #NAME? - unrecognized name or function
    Name,
    /// #NUM! - invalid numeric value
    Num,
    /// #N/A - value not available
    Na,
    /// Circular-reference sentinel (not reachable from formula text)
    Circular,
}

impl CellError {
    /// Parse an error literal as it appears in formula text
    ///
    /// Returns `None` for unknown literals and for the circular
    /// sentinel, which has no formula-text spelling.
    pub fn from_literal(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "#NULL!" => Some(CellError::Null),
            "#DIV/0!" => Some(CellError::Div0),
            "#VALUE!" => Some(CellError::Value),
            "#REF!" => Some(CellError::Ref),
            "#NAME?" => Some(CellError::Name),
            "#NUM!" => Some(CellError::Num),
            "#N/A" => Some(CellError::Na),
            _ => None,
        }
    }

    /// The literal used in formula text and displayed results
    pub fn literal(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
            CellError::Circular => "#CIRCULAR!",
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.literal())
    }
}

/// What one cell holds, as handed to the engine by a [`DocumentView`]
///
/// Formula cells carry their source text; the engine parses and
/// evaluates it on demand through the dependency cache.
///
/// [`DocumentView`]: crate::view::DocumentView
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    /// Empty cell
    Blank,
    /// Numeric value
    Number(f64),
    /// Text value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Error value
    Error(CellError),
    /// Formula source text (e.g., "=SUM(A1:A10)")
    Formula(String),
}

impl CellContent {
    /// Whether this cell is empty
    pub fn is_blank(&self) -> bool {
        matches!(self, CellContent::Blank)
    }

    /// Whether this cell holds a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellContent::Formula(_))
    }
}

impl From<f64> for CellContent {
    fn from(n: f64) -> Self {
        CellContent::Number(n)
    }
}

impl From<bool> for CellContent {
    fn from(b: bool) -> Self {
        CellContent::Bool(b)
    }
}

impl From<&str> for CellContent {
    fn from(s: &str) -> Self {
        CellContent::Text(s.to_string())
    }
}

impl From<String> for CellContent {
    fn from(s: String) -> Self {
        CellContent::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_literal_round_trip() {
        for err in [
            CellError::Null,
            CellError::Div0,
            CellError::Value,
            CellError::Ref,
            CellError::Name,
            CellError::Num,
            CellError::Na,
        ] {
            assert_eq!(CellError::from_literal(err.literal()), Some(err));
        }
    }

    #[test]
    fn test_circular_is_not_parseable() {
        assert_eq!(CellError::from_literal("#CIRCULAR!"), None);
        assert_eq!(CellError::Circular.literal(), "#CIRCULAR!");
    }

    #[test]
    fn test_unknown_literal() {
        assert_eq!(CellError::from_literal("#BOGUS!"), None);
    }
}
