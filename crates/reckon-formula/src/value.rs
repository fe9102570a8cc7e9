//! Evaluation results and coercion rules

use reckon_core::CellError;
use std::fmt;

/// The result of evaluating a formula or dereferencing a cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    Error(CellError),
    /// Row-major grid of scalar results
    Array(Vec<Vec<Value>>),
    Blank,
}

impl Value {
    /// Coerce to a number for arithmetic: blank is 0, booleans are
    /// 0/1, numeric text parses, anything else is `#VALUE!`
    pub fn coerce_number(&self) -> Result<f64, CellError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Blank => Ok(0.0),
            Value::Text(s) => s.trim().parse().map_err(|_| CellError::Value),
            Value::Error(e) => Err(*e),
            Value::Array(_) => Err(CellError::Value),
        }
    }

    /// Coerce to a boolean: numbers are nonzero, text "TRUE"/"FALSE"
    /// parses, blank is false, other text is `#VALUE!`
    pub fn coerce_bool(&self) -> Result<bool, CellError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => Ok(*n != 0.0),
            Value::Blank => Ok(false),
            Value::Text(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Ok(false)
                } else {
                    Err(CellError::Value)
                }
            }
            Value::Error(e) => Err(*e),
            Value::Array(_) => Err(CellError::Value),
        }
    }

    /// Coerce to text for concatenation: blank is the empty string
    pub fn coerce_text(&self) -> Result<String, CellError> {
        match self {
            Value::Text(s) => Ok(s.clone()),
            Value::Number(n) => Ok(format_number(*n)),
            Value::Bool(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Value::Blank => Ok(String::new()),
            Value::Error(e) => Err(*e),
            Value::Array(_) => Err(CellError::Value),
        }
    }

    /// The error carried by this value, if it is one
    pub fn as_error(&self) -> Option<CellError> {
        match self {
            Value::Error(e) => Some(*e),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Blank)
    }

    /// Cross-type rank for comparisons: Boolean > Text > Number > Blank
    fn type_rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 3,
            Value::Text(_) => 2,
            Value::Number(_) => 1,
            Value::Blank => 0,
            // Errors and arrays never reach compare(); operators
            // short-circuit errors first
            Value::Error(_) | Value::Array(_) => 0,
        }
    }

    /// Ordering used by the comparison operators. Same-type operands
    /// compare naturally (text case-insensitively); mixed types order
    /// by rank, Boolean > Text > Number > Blank.
    pub fn compare(&self, other: &Value) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Text(a), Value::Text(b)) => {
                a.to_lowercase().cmp(&b.to_lowercase())
            }
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Blank, Value::Blank) => Ordering::Equal,
            // Blank compares against the other type's zero value
            (Value::Blank, Value::Number(b)) => 0.0.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Number(a), Value::Blank) => a.partial_cmp(&0.0).unwrap_or(Ordering::Equal),
            (Value::Blank, Value::Text(b)) => {
                if b.is_empty() { Ordering::Equal } else { Ordering::Less }
            }
            (Value::Text(a), Value::Blank) => {
                if a.is_empty() { Ordering::Equal } else { Ordering::Greater }
            }
            (Value::Blank, Value::Bool(b)) => false.cmp(b),
            (Value::Bool(a), Value::Blank) => a.cmp(&false),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Error(e) => write!(f, "{e}"),
            Value::Blank => Ok(()),
            Value::Array(rows) => {
                write!(f, "{{")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ";")?;
                    }
                    for (j, v) in row.iter().enumerate() {
                        if j > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{v}")?;
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<CellError> for Value {
    fn from(e: CellError) -> Self {
        Value::Error(e)
    }
}

/// Format a number the way formula text does: integers without a
/// trailing `.0`, everything else via the shortest round-trip form
pub fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::Blank.coerce_number(), Ok(0.0));
        assert_eq!(Value::Bool(true).coerce_number(), Ok(1.0));
        assert_eq!(Value::Text(" 2.5 ".into()).coerce_number(), Ok(2.5));
        assert_eq!(
            Value::Text("abc".into()).coerce_number(),
            Err(CellError::Value)
        );
        assert_eq!(
            Value::Error(CellError::Div0).coerce_number(),
            Err(CellError::Div0)
        );
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(Value::Number(3.0).coerce_text(), Ok("3".to_string()));
        assert_eq!(Value::Number(3.5).coerce_text(), Ok("3.5".to_string()));
        assert_eq!(Value::Blank.coerce_text(), Ok(String::new()));
        assert_eq!(Value::Bool(false).coerce_text(), Ok("FALSE".to_string()));
    }

    #[test]
    fn test_mixed_type_ordering() {
        // Boolean > Text > Number
        assert_eq!(
            Value::Bool(false).compare(&Value::Text("zzz".into())),
            Ordering::Greater
        );
        assert_eq!(
            Value::Text("a".into()).compare(&Value::Number(1e9)),
            Ordering::Greater
        );
        assert_eq!(
            Value::Number(-5.0).compare(&Value::Bool(false)),
            Ordering::Less
        );
    }

    #[test]
    fn test_same_type_ordering() {
        assert_eq!(
            Value::Text("Apple".into()).compare(&Value::Text("apple".into())),
            Ordering::Equal
        );
        assert_eq!(
            Value::Number(1.0).compare(&Value::Number(2.0)),
            Ordering::Less
        );
    }

    #[test]
    fn test_blank_comparisons() {
        assert_eq!(Value::Blank.compare(&Value::Number(0.0)), Ordering::Equal);
        assert_eq!(Value::Blank.compare(&Value::Number(-1.0)), Ordering::Greater);
        assert_eq!(Value::Blank.compare(&Value::Text("".into())), Ordering::Equal);
        assert_eq!(Value::Blank.compare(&Value::Bool(false)), Ordering::Equal);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-1.0), "-1");
        assert_eq!(format_number(3.14), "3.14");
        assert_eq!(format_number(1e20), "100000000000000000000");
    }
}
