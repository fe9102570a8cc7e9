//! Formula rendering
//!
//! Turns a token program back into formula text. Rendering a parsed
//! program and re-parsing it yields the same program, which is how
//! shifted formulas get written back into cells.

use crate::error::{EvalError, EvalResult};
use crate::token::{BinaryOp, ParsedFormula, TableRegion, TableSelector, Token, UnaryOp};
use crate::value::format_number;
use reckon_core::{CellAddress, CellRange, NamingEnvironment};

/// Render a token program as formula text (no leading `=`)
pub fn render(formula: &ParsedFormula, env: &dyn NamingEnvironment) -> EvalResult<String> {
    let mut stack: Vec<String> = Vec::new();

    for token in &formula.tokens {
        match token {
            Token::Number(n) => stack.push(format_number(*n)),
            Token::Text(s) => stack.push(format!("\"{}\"", s.replace('"', "\"\""))),
            Token::Bool(b) => stack.push(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Token::Err(e) => stack.push(e.literal().to_string()),
            Token::MissingArg => stack.push(String::new()),

            Token::Ref(r) => {
                stack.push(format!(
                    "{}{}",
                    sheet_prefix(r.sheet, env),
                    r.addr.to_a1_string()
                ));
            }
            Token::Area(a) => {
                stack.push(format!(
                    "{}{}",
                    sheet_prefix(a.sheet, env),
                    area_text(&a.range)
                ));
            }
            Token::Ref3d {
                first_sheet,
                last_sheet,
                addr,
            } => {
                stack.push(format!(
                    "{}{}",
                    sheet_span_prefix(*first_sheet, *last_sheet, env),
                    addr.to_a1_string()
                ));
            }
            Token::Area3d {
                first_sheet,
                last_sheet,
                range,
            } => {
                stack.push(format!(
                    "{}{}",
                    sheet_span_prefix(*first_sheet, *last_sheet, env),
                    area_text(range)
                ));
            }
            Token::ExternRef {
                workbook,
                sheet,
                addr,
            } => {
                stack.push(format!(
                    "[{workbook}]{}!{}",
                    quote_sheet_name(sheet),
                    addr.to_a1_string()
                ));
            }
            Token::ExternArea {
                workbook,
                sheet,
                range,
            } => {
                stack.push(format!(
                    "[{workbook}]{}!{}",
                    quote_sheet_name(sheet),
                    area_text(range)
                ));
            }
            Token::Name(name) => stack.push(name.clone()),
            Token::NameX { workbook, name } => stack.push(format!("[{workbook}]!{name}")),
            Token::Structured {
                table, selector, ..
            } => {
                stack.push(format!("{table}[{}]", selector_text(selector)));
            }
            Token::RefErr => stack.push("#REF!".to_string()),

            Token::Binary(op) => {
                let b = pop(&mut stack)?;
                let a = pop(&mut stack)?;
                stack.push(format!("{a}{}{b}", binary_text(*op)));
            }
            Token::Unary(op) => {
                let a = pop(&mut stack)?;
                stack.push(match op {
                    UnaryOp::Neg => format!("-{a}"),
                    UnaryOp::Plus => format!("+{a}"),
                    UnaryOp::Percent => format!("{a}%"),
                });
            }
            Token::Paren => {
                let a = pop(&mut stack)?;
                stack.push(format!("({a})"));
            }
            Token::Func { name, argc } => {
                let argc = *argc as usize;
                if stack.len() < argc {
                    return Err(EvalError::InvalidProgram("operand underflow"));
                }
                let args = stack.split_off(stack.len() - argc);
                stack.push(format!("{name}({})", args.join(",")));
            }
            Token::ArrayLit { rows, cols, values } => {
                stack.push(array_literal_text(*rows, *cols, values)?);
            }

            // Control tokens are invisible in the text form; the Func
            // token they guard renders the whole call
            Token::Skip(_) | Token::SkipIfFalse(_) => {}
        }
    }

    if stack.len() != 1 {
        return Err(EvalError::InvalidProgram("unbalanced token program"));
    }
    Ok(stack.remove(0))
}

fn pop(stack: &mut Vec<String>) -> EvalResult<String> {
    stack
        .pop()
        .ok_or(EvalError::InvalidProgram("operand underflow"))
}

fn binary_text(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Pow => "^",
        BinaryOp::Concat => "&",
        BinaryOp::Eq => "=",
        BinaryOp::Ne => "<>",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Range => ":",
        BinaryOp::Union => ",",
        BinaryOp::Intersect => " ",
    }
}

/// Whole-column and whole-row areas have their own text form
fn area_text(range: &CellRange) -> String {
    if range.is_whole_columns() {
        return format!(
            "{}:{}",
            column_text(range.start),
            column_text(range.end)
        );
    }
    if range.is_whole_rows() {
        return format!("{}:{}", row_text(range.start), row_text(range.end));
    }
    range.to_a1_string()
}

fn column_text(addr: CellAddress) -> String {
    let dollar = if addr.col_absolute { "$" } else { "" };
    format!("{dollar}{}", CellAddress::column_to_letters(addr.col))
}

fn row_text(addr: CellAddress) -> String {
    let dollar = if addr.row_absolute { "$" } else { "" };
    format!("{dollar}{}", addr.row + 1)
}

/// `Sheet1!` prefix, quoted when the name needs it. A sheet index the
/// document no longer has renders as the reference error literal.
fn sheet_prefix(sheet: Option<u32>, env: &dyn NamingEnvironment) -> String {
    match sheet {
        None => String::new(),
        Some(idx) => match env.sheet_name(idx) {
            Some(name) => format!("{}!", quote_sheet_name(name)),
            None => "#REF!!".to_string(),
        },
    }
}

fn sheet_span_prefix(first: u32, last: u32, env: &dyn NamingEnvironment) -> String {
    let first_name = env.sheet_name(first);
    let last_name = env.sheet_name(last);
    match (first_name, last_name) {
        (Some(a), Some(b)) => {
            if needs_quoting(a) || needs_quoting(b) {
                format!("'{}:{}'!", escape_quotes(a), escape_quotes(b))
            } else {
                format!("{a}:{b}!")
            }
        }
        _ => "#REF!!".to_string(),
    }
}

fn quote_sheet_name(name: &str) -> String {
    if needs_quoting(name) {
        format!("'{}'", escape_quotes(name))
    } else {
        name.to_string()
    }
}

fn escape_quotes(name: &str) -> String {
    name.replace('\'', "''")
}

fn needs_quoting(name: &str) -> bool {
    if name.is_empty() {
        return true;
    }
    let mut chars = name.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return true,
    };
    if !(first.is_alphabetic() || first == '_') {
        return true;
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return true;
    }
    // A bare sheet name that scans as a cell or a boolean would be
    // misread without quotes
    CellAddress::parse(name).is_ok()
        || name.eq_ignore_ascii_case("TRUE")
        || name.eq_ignore_ascii_case("FALSE")
}

fn region_keyword(region: TableRegion) -> &'static str {
    match region {
        TableRegion::All => "#All",
        TableRegion::Data => "#Data",
        TableRegion::Headers => "#Headers",
        TableRegion::Totals => "#Totals",
        TableRegion::ThisRow => "#This Row",
    }
}

fn selector_text(selector: &TableSelector) -> String {
    match (selector.region, &selector.columns) {
        (None, None) => String::new(),
        (Some(TableRegion::ThisRow), Some((col, None))) => format!("@{col}"),
        (Some(TableRegion::ThisRow), None) => "@".to_string(),
        (Some(r), None) => region_keyword(r).to_string(),
        (None, Some((col, None))) => col.clone(),
        (None, Some((first, Some(last)))) => format!("[{first}]:[{last}]"),
        (Some(r), Some((first, Some(last)))) => {
            format!("[{}],[{first}]:[{last}]", region_keyword(r))
        }
        (Some(r), Some((col, None))) => format!("[{}],[{col}]", region_keyword(r)),
    }
}

fn array_literal_text(rows: u32, cols: u16, values: &[Token]) -> EvalResult<String> {
    let mut out = String::from("{");
    for r in 0..rows as usize {
        if r > 0 {
            out.push(';');
        }
        for c in 0..cols as usize {
            if c > 0 {
                out.push(',');
            }
            let element = values
                .get(r * cols as usize + c)
                .ok_or(EvalError::InvalidProgram("short array literal"))?;
            match element {
                Token::Number(n) => out.push_str(&format_number(*n)),
                Token::Text(s) => {
                    out.push('"');
                    out.push_str(&s.replace('"', "\"\""));
                    out.push('"');
                }
                Token::Bool(b) => out.push_str(if *b { "TRUE" } else { "FALSE" }),
                Token::Err(e) => out.push_str(e.literal()),
                _ => return Err(EvalError::InvalidProgram("non-constant in array literal")),
            }
        }
    }
    out.push('}');
    Ok(out)
}
