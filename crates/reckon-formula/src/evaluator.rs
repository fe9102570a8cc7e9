//! Token program interpreter
//!
//! A stack machine over [`Token`] programs. References stay symbolic
//! on the stack as [`Operand`]s and are dereferenced as late as
//! possible: an aggregate expands an area itself, a scalar context
//! applies implicit intersection, and a skipped branch is never
//! dereferenced at all. Cell reads go through the engine so the
//! dependency cache observes exactly what was touched.

use reckon_core::{CellCoord, CellError, CellRange};

use crate::engine::Engine;
use crate::error::{EvalError, EvalResult};
use crate::token::{BinaryOp, FormulaKind, ParsedFormula, Token, UnaryOp};
use crate::value::Value;

/// A stack slot during evaluation
///
/// Values are final; everything else is a reference form that gets
/// dereferenced according to the context consuming it.
#[derive(Debug, Clone)]
pub enum Operand {
    Value(Value),
    /// One cell
    Ref { sheet: u32, row: u32, col: u16 },
    /// A rectangle, possibly spanning a run of sheets
    Area {
        first_sheet: u32,
        last_sheet: u32,
        range: CellRange,
    },
    /// A rectangle in another workbook; the sheet stays textual until
    /// the linked engine resolves it
    Extern {
        workbook: u32,
        sheet: String,
        range: CellRange,
    },
    /// A defined name in another workbook
    ExternName { workbook: u32, name: String },
    /// A defined name, resolved lazily so IF can skip over it
    Name(String),
    /// Comma-combined references
    Union(Vec<Operand>),
    /// An omitted argument
    Missing,
}

impl Engine<'_> {
    /// Run a token program and produce the cell's final value
    pub(crate) fn run_program(
        &self,
        program: &ParsedFormula,
        origin: CellCoord,
    ) -> EvalResult<Value> {
        let result = self.run_tokens(program, origin)?;
        match program.kind {
            FormulaKind::Cell => {
                let value = self.deref_scalar(result, origin)?;
                // A formula yielding blank displays as zero
                Ok(if value.is_blank() {
                    Value::Number(0.0)
                } else {
                    value
                })
            }
            FormulaKind::Array { rows, cols } => {
                let value = self.deref_matrix(result, origin)?;
                Ok(broadcast(value, rows, cols))
            }
        }
    }

    /// Run a token program, leaving the final operand undereferenced
    pub(crate) fn run_tokens(
        &self,
        program: &ParsedFormula,
        origin: CellCoord,
    ) -> EvalResult<Operand> {
        let array_mode = matches!(program.kind, FormulaKind::Array { .. });
        let tokens = &program.tokens;
        let mut stack: Vec<Operand> = Vec::new();
        let mut i = 0usize;

        while i < tokens.len() {
            match &tokens[i] {
                Token::Number(n) => stack.push(Operand::Value(Value::Number(*n))),
                Token::Text(s) => stack.push(Operand::Value(Value::Text(s.clone()))),
                Token::Bool(b) => stack.push(Operand::Value(Value::Bool(*b))),
                Token::Err(e) => stack.push(Operand::Value(Value::Error(*e))),
                Token::MissingArg => stack.push(Operand::Missing),

                Token::Ref(r) => stack.push(Operand::Ref {
                    sheet: r.sheet.unwrap_or(origin.sheet),
                    row: r.addr.row,
                    col: r.addr.col,
                }),
                Token::Area(a) => {
                    let sheet = a.sheet.unwrap_or(origin.sheet);
                    stack.push(Operand::Area {
                        first_sheet: sheet,
                        last_sheet: sheet,
                        range: a.range,
                    });
                }
                Token::Ref3d {
                    first_sheet,
                    last_sheet,
                    addr,
                } => {
                    if first_sheet == last_sheet {
                        stack.push(Operand::Ref {
                            sheet: *first_sheet,
                            row: addr.row,
                            col: addr.col,
                        });
                    } else {
                        stack.push(Operand::Area {
                            first_sheet: *first_sheet,
                            last_sheet: *last_sheet,
                            range: CellRange::new(*addr, *addr),
                        });
                    }
                }
                Token::Area3d {
                    first_sheet,
                    last_sheet,
                    range,
                } => stack.push(Operand::Area {
                    first_sheet: *first_sheet,
                    last_sheet: *last_sheet,
                    range: *range,
                }),
                Token::ExternRef {
                    workbook,
                    sheet,
                    addr,
                } => stack.push(Operand::Extern {
                    workbook: *workbook,
                    sheet: sheet.clone(),
                    range: CellRange::new(*addr, *addr),
                }),
                Token::ExternArea {
                    workbook,
                    sheet,
                    range,
                } => stack.push(Operand::Extern {
                    workbook: *workbook,
                    sheet: sheet.clone(),
                    range: *range,
                }),
                Token::Name(name) => stack.push(Operand::Name(name.clone())),
                Token::NameX { workbook, name } => stack.push(Operand::ExternName {
                    workbook: *workbook,
                    name: name.clone(),
                }),
                Token::Structured { area, .. } => match area {
                    Ok(a) => {
                        let sheet = a.sheet.unwrap_or(origin.sheet);
                        stack.push(Operand::Area {
                            first_sheet: sheet,
                            last_sheet: sheet,
                            range: a.range,
                        });
                    }
                    Err(e) => stack.push(Operand::Value(Value::Error(*e))),
                },
                Token::RefErr => stack.push(Operand::Value(Value::Error(CellError::Ref))),

                Token::ArrayLit { rows, cols, values } => {
                    stack.push(Operand::Value(array_literal_value(*rows, *cols, values)?));
                }

                Token::Paren => {}

                Token::Binary(op) => {
                    let b = pop(&mut stack)?;
                    let a = pop(&mut stack)?;
                    let result = self.apply_binary(*op, a, b, origin, array_mode)?;
                    stack.push(result);
                }
                Token::Unary(op) => {
                    let a = pop(&mut stack)?;
                    let value = self.apply_unary(*op, a, origin, array_mode)?;
                    stack.push(Operand::Value(value));
                }

                Token::Func { name, argc } => {
                    let argc = *argc as usize;
                    if stack.len() < argc {
                        return Err(EvalError::InvalidProgram("operand underflow"));
                    }
                    let args = stack.split_off(stack.len() - argc);
                    let value = self.call_function(name, &args, origin, array_mode)?;
                    stack.push(Operand::Value(value));
                }

                // Control tokens. In array context every branch
                // contributes to the result, so both are inert and the
                // registry IF runs off its Func token.
                Token::SkipIfFalse(n) => {
                    if !array_mode {
                        let n = *n as usize;
                        let cond = pop(&mut stack)?;
                        let cond = self.deref_scalar(cond, origin)?;
                        match cond.coerce_bool() {
                            Ok(true) => {}
                            Ok(false) => {
                                let target = i + 1 + n;
                                // With no false branch the jump lands on
                                // the Func token itself; feed it the
                                // arguments it expects
                                if matches!(tokens.get(target), Some(Token::Func { .. })) {
                                    stack.push(Operand::Value(cond));
                                    stack.push(Operand::Value(Value::Bool(false)));
                                }
                                i = target;
                                continue;
                            }
                            Err(e) => {
                                stack.push(Operand::Value(Value::Error(e)));
                                i += n;
                                continue;
                            }
                        }
                    }
                }
                Token::Skip(n) => {
                    if !array_mode {
                        if let Some(top @ Operand::Missing) = stack.last_mut() {
                            *top = Operand::Value(Value::Blank);
                        }
                        i += 1 + *n as usize;
                        continue;
                    }
                }
            }
            i += 1;
        }

        if stack.len() != 1 {
            return Err(EvalError::InvalidProgram("unbalanced token program"));
        }
        pop(&mut stack)
    }

    fn call_function(
        &self,
        name: &str,
        args: &[Operand],
        origin: CellCoord,
        array_mode: bool,
    ) -> EvalResult<Value> {
        let Some(def) = self.functions.get(name) else {
            return Ok(Value::Error(CellError::Name));
        };
        let (min_args, max_args, volatile, implementation) =
            (def.min_args, def.max_args, def.volatile, def.implementation);

        if args.len() < min_args || max_args.is_some_and(|max| args.len() > max) {
            return Ok(Value::Error(CellError::Value));
        }
        if volatile {
            self.cache.borrow_mut().mark_volatile();
        }

        let mut ctx = FunctionContext {
            engine: self,
            origin,
            array_mode,
        };
        implementation(args, &mut ctx)
    }

    fn apply_binary(
        &self,
        op: BinaryOp,
        a: Operand,
        b: Operand,
        origin: CellCoord,
        array_mode: bool,
    ) -> EvalResult<Operand> {
        match op {
            BinaryOp::Range => Ok(range_op(a, b)),
            BinaryOp::Union => {
                let mut members = Vec::new();
                flatten_union(a, &mut members);
                flatten_union(b, &mut members);
                Ok(Operand::Union(members))
            }
            BinaryOp::Intersect => Ok(intersect_op(a, b)),
            _ => {
                let va = self.deref_for_op(a, origin, array_mode)?;
                let vb = self.deref_for_op(b, origin, array_mode)?;
                Ok(Operand::Value(binary_values(op, &va, &vb)))
            }
        }
    }

    fn apply_unary(
        &self,
        op: UnaryOp,
        a: Operand,
        origin: CellCoord,
        array_mode: bool,
    ) -> EvalResult<Value> {
        let value = self.deref_for_op(a, origin, array_mode)?;
        Ok(unary_value(op, &value))
    }

    fn deref_for_op(
        &self,
        op: Operand,
        origin: CellCoord,
        array_mode: bool,
    ) -> EvalResult<Value> {
        if array_mode {
            self.deref_matrix(op, origin)
        } else {
            self.deref_scalar(op, origin)
        }
    }

    /// Dereference an operand in scalar context
    ///
    /// A multi-cell area is subject to implicit intersection: a single
    /// column intersected with the formula's own row (or a single row
    /// with its column). Anything else is a `#VALUE!`.
    pub(crate) fn deref_scalar(&self, op: Operand, origin: CellCoord) -> EvalResult<Value> {
        match op {
            Operand::Value(v) => Ok(v),
            Operand::Missing => Ok(Value::Blank),
            Operand::Ref { sheet, row, col } => self.resolve(CellCoord::new(sheet, row, col)),
            Operand::Area {
                first_sheet,
                last_sheet,
                range,
            } => {
                if first_sheet != last_sheet {
                    return Ok(Value::Error(CellError::Value));
                }
                if range.is_single_cell() {
                    return self.resolve(CellCoord::new(
                        first_sheet,
                        range.start.row,
                        range.start.col,
                    ));
                }
                if range.start.col == range.end.col
                    && origin.row >= range.start.row
                    && origin.row <= range.end.row
                {
                    return self.resolve(CellCoord::new(first_sheet, origin.row, range.start.col));
                }
                if range.start.row == range.end.row
                    && origin.col >= range.start.col
                    && origin.col <= range.end.col
                {
                    return self.resolve(CellCoord::new(first_sheet, range.start.row, origin.col));
                }
                Ok(Value::Error(CellError::Value))
            }
            Operand::Extern {
                workbook,
                sheet,
                range,
            } => {
                if range.is_single_cell() {
                    self.resolve_external(workbook, &sheet, range.start.row, range.start.col)
                } else {
                    Ok(Value::Error(CellError::Value))
                }
            }
            Operand::ExternName { workbook, name } => {
                self.resolve_external_name(workbook, &name)
            }
            Operand::Name(name) => {
                let resolved = self.resolve_name(&name, origin)?;
                self.deref_scalar(resolved, origin)
            }
            Operand::Union(_) => Ok(Value::Error(CellError::Value)),
        }
    }

    /// Dereference an operand in array context: areas become arrays
    fn deref_matrix(&self, op: Operand, origin: CellCoord) -> EvalResult<Value> {
        match op {
            Operand::Value(v) => Ok(v),
            Operand::Missing => Ok(Value::Blank),
            Operand::Ref { sheet, row, col } => self.resolve(CellCoord::new(sheet, row, col)),
            Operand::Area {
                first_sheet,
                last_sheet,
                range,
            } => {
                if first_sheet != last_sheet {
                    return Ok(Value::Error(CellError::Value));
                }
                let bounded = self.clamp_to_used(first_sheet, range);
                let mut rows = Vec::with_capacity(bounded.row_count() as usize);
                for row in bounded.start.row..=bounded.end.row {
                    let mut cells = Vec::with_capacity(bounded.col_count() as usize);
                    for col in bounded.start.col..=bounded.end.col {
                        cells.push(self.resolve(CellCoord::new(first_sheet, row, col))?);
                    }
                    rows.push(cells);
                }
                Ok(Value::Array(rows))
            }
            Operand::Name(name) => {
                let resolved = self.resolve_name(&name, origin)?;
                self.deref_matrix(resolved, origin)
            }
            Operand::Extern { .. } | Operand::ExternName { .. } => {
                // Cross-workbook operands stay scalar even in array
                // context
                self.deref_scalar(op, origin)
            }
            Operand::Union(_) => Ok(Value::Error(CellError::Value)),
        }
    }

    /// Flatten an operand into individual values for an aggregate
    pub(crate) fn expand(
        &self,
        op: &Operand,
        origin: CellCoord,
        out: &mut Vec<Value>,
    ) -> EvalResult<()> {
        match op {
            Operand::Value(Value::Array(rows)) => {
                for row in rows {
                    out.extend(row.iter().cloned());
                }
            }
            Operand::Value(v) => out.push(v.clone()),
            Operand::Missing => out.push(Value::Blank),
            Operand::Ref { sheet, row, col } => {
                out.push(self.resolve(CellCoord::new(*sheet, *row, *col))?);
            }
            Operand::Area {
                first_sheet,
                last_sheet,
                range,
            } => {
                for sheet in *first_sheet..=*last_sheet {
                    let bounded = self.clamp_to_used(sheet, *range);
                    for row in bounded.start.row..=bounded.end.row {
                        for col in bounded.start.col..=bounded.end.col {
                            out.push(self.resolve(CellCoord::new(sheet, row, col))?);
                        }
                    }
                }
            }
            Operand::Extern {
                workbook,
                sheet,
                range,
            } => {
                for row in range.start.row..=range.end.row {
                    for col in range.start.col..=range.end.col {
                        out.push(self.resolve_external(*workbook, sheet, row, col)?);
                    }
                }
            }
            Operand::ExternName { workbook, name } => {
                out.push(self.resolve_external_name(*workbook, name)?);
            }
            Operand::Name(name) => {
                let resolved = self.resolve_name(name, origin)?;
                self.expand(&resolved, origin, out)?;
            }
            Operand::Union(members) => {
                for member in members {
                    self.expand(member, origin, out)?;
                }
            }
        }
        Ok(())
    }

    /// Trim the empty tail off whole-column/whole-row spans so
    /// iteration is bounded by the sheet's occupied extent
    fn clamp_to_used(&self, sheet: u32, range: CellRange) -> CellRange {
        let (used_rows, used_cols) = self.doc.used_extent(sheet);
        let last_row = range.end.row.min(used_rows.saturating_sub(1)).max(range.start.row);
        let last_col = range.end.col.min(used_cols.saturating_sub(1)).max(range.start.col);
        CellRange::new(
            range.start,
            reckon_core::CellAddress::new(last_row, last_col),
        )
    }
}

/// Evaluation context handed to function implementations
pub struct FunctionContext<'a, 'b> {
    pub(crate) engine: &'b Engine<'a>,
    origin: CellCoord,
    array_mode: bool,
}

impl FunctionContext<'_, '_> {
    /// The cell this formula lives in
    pub fn origin(&self) -> CellCoord {
        self.origin
    }

    pub fn array_mode(&self) -> bool {
        self.array_mode
    }

    /// Dereference an argument to one value
    ///
    /// In an array formula a multi-cell area comes back as `Value::Array`;
    /// otherwise areas go through implicit intersection.
    pub fn value(&mut self, op: &Operand) -> EvalResult<Value> {
        self.engine
            .deref_for_op(op.clone(), self.origin, self.array_mode)
    }

    /// Flatten an argument to every value it covers
    pub fn values(&mut self, op: &Operand) -> EvalResult<Vec<Value>> {
        let mut out = Vec::new();
        self.engine.expand(op, self.origin, &mut out)?;
        Ok(out)
    }
}

fn pop(stack: &mut Vec<Operand>) -> EvalResult<Operand> {
    stack
        .pop()
        .ok_or(EvalError::InvalidProgram("operand underflow"))
}

fn array_literal_value(rows: u32, cols: u16, values: &[Token]) -> EvalResult<Value> {
    let mut out = Vec::with_capacity(rows as usize);
    for r in 0..rows as usize {
        let mut row = Vec::with_capacity(cols as usize);
        for c in 0..cols as usize {
            let element = values
                .get(r * cols as usize + c)
                .ok_or(EvalError::InvalidProgram("short array literal"))?;
            row.push(match element {
                Token::Number(n) => Value::Number(*n),
                Token::Text(s) => Value::Text(s.clone()),
                Token::Bool(b) => Value::Bool(*b),
                Token::Err(e) => Value::Error(*e),
                _ => return Err(EvalError::InvalidProgram("non-constant in array literal")),
            });
        }
        out.push(row);
    }
    Ok(Value::Array(out))
}

/// `a:b` over arbitrary operands: the bounding box of two references
fn range_op(a: Operand, b: Operand) -> Operand {
    let (Some((sheet_a, range_a)), Some((sheet_b, range_b))) =
        (single_sheet_extent(&a), single_sheet_extent(&b))
    else {
        return Operand::Value(Value::Error(CellError::Value));
    };
    if sheet_a != sheet_b {
        return Operand::Value(Value::Error(CellError::Value));
    }

    let start = reckon_core::CellAddress::new(
        range_a.start.row.min(range_b.start.row),
        range_a.start.col.min(range_b.start.col),
    );
    let end = reckon_core::CellAddress::new(
        range_a.end.row.max(range_b.end.row),
        range_a.end.col.max(range_b.end.col),
    );
    Operand::Area {
        first_sheet: sheet_a,
        last_sheet: sheet_a,
        range: CellRange::new(start, end),
    }
}

fn intersect_op(a: Operand, b: Operand) -> Operand {
    let (Some((sheet_a, range_a)), Some((sheet_b, range_b))) =
        (single_sheet_extent(&a), single_sheet_extent(&b))
    else {
        return Operand::Value(Value::Error(CellError::Value));
    };
    if sheet_a != sheet_b {
        return Operand::Value(Value::Error(CellError::Null));
    }
    match range_a.intersect(&range_b) {
        Some(range) => Operand::Area {
            first_sheet: sheet_a,
            last_sheet: sheet_a,
            range,
        },
        None => Operand::Value(Value::Error(CellError::Null)),
    }
}

fn single_sheet_extent(op: &Operand) -> Option<(u32, CellRange)> {
    match op {
        Operand::Ref { sheet, row, col } => {
            let addr = reckon_core::CellAddress::new(*row, *col);
            Some((*sheet, CellRange::new(addr, addr)))
        }
        Operand::Area {
            first_sheet,
            last_sheet,
            range,
        } if first_sheet == last_sheet => Some((*first_sheet, *range)),
        _ => None,
    }
}

fn flatten_union(op: Operand, out: &mut Vec<Operand>) {
    match op {
        Operand::Union(members) => out.extend(members),
        other => out.push(other),
    }
}

/// Apply a value-level binary operator, element-wise over arrays
pub(crate) fn binary_values(op: BinaryOp, a: &Value, b: &Value) -> Value {
    if matches!(a, Value::Array(_)) || matches!(b, Value::Array(_)) {
        return elementwise(a, b, |x, y| binary_values(op, x, y));
    }
    if let Some(e) = a.as_error() {
        return Value::Error(e);
    }
    if let Some(e) = b.as_error() {
        return Value::Error(e);
    }

    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
            let x = match a.coerce_number() {
                Ok(x) => x,
                Err(e) => return Value::Error(e),
            };
            let y = match b.coerce_number() {
                Ok(y) => y,
                Err(e) => return Value::Error(e),
            };
            let result = match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div => {
                    if y == 0.0 {
                        return Value::Error(CellError::Div0);
                    }
                    x / y
                }
                _ => x.powf(y),
            };
            if result.is_finite() {
                Value::Number(result)
            } else {
                Value::Error(CellError::Num)
            }
        }
        BinaryOp::Concat => {
            let x = match a.coerce_text() {
                Ok(x) => x,
                Err(e) => return Value::Error(e),
            };
            let y = match b.coerce_text() {
                Ok(y) => y,
                Err(e) => return Value::Error(e),
            };
            Value::Text(x + &y)
        }
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = a.compare(b);
            let result = match op {
                BinaryOp::Eq => ordering.is_eq(),
                BinaryOp::Ne => !ordering.is_eq(),
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Value::Bool(result)
        }
        BinaryOp::Range | BinaryOp::Union | BinaryOp::Intersect => {
            Value::Error(CellError::Value)
        }
    }
}

fn unary_value(op: UnaryOp, value: &Value) -> Value {
    if let Value::Array(rows) = value {
        return Value::Array(
            rows.iter()
                .map(|row| row.iter().map(|v| unary_value(op, v)).collect())
                .collect(),
        );
    }
    if let Some(e) = value.as_error() {
        return Value::Error(e);
    }
    match op {
        // Unary plus passes any value through untouched
        UnaryOp::Plus => value.clone(),
        UnaryOp::Neg => match value.coerce_number() {
            Ok(n) => Value::Number(-n),
            Err(e) => Value::Error(e),
        },
        UnaryOp::Percent => match value.coerce_number() {
            Ok(n) => Value::Number(n / 100.0),
            Err(e) => Value::Error(e),
        },
    }
}

fn elementwise(a: &Value, b: &Value, f: impl Fn(&Value, &Value) -> Value) -> Value {
    let rows = array_rows(a).max(array_rows(b));
    let cols = array_cols(a).max(array_cols(b));
    let mut out = Vec::with_capacity(rows);
    for r in 0..rows {
        let mut row = Vec::with_capacity(cols);
        for c in 0..cols {
            match (element_at(a, r, c), element_at(b, r, c)) {
                (Some(x), Some(y)) => row.push(f(x, y)),
                _ => row.push(Value::Error(CellError::Na)),
            }
        }
        out.push(row);
    }
    Value::Array(out)
}

fn array_rows(v: &Value) -> usize {
    match v {
        Value::Array(rows) => rows.len(),
        _ => 1,
    }
}

fn array_cols(v: &Value) -> usize {
    match v {
        Value::Array(rows) => rows.first().map_or(0, |r| r.len()),
        _ => 1,
    }
}

/// Element lookup with single-row/column broadcast
fn element_at<'v>(v: &'v Value, row: usize, col: usize) -> Option<&'v Value> {
    match v {
        Value::Array(rows) => {
            let r = if rows.len() == 1 { 0 } else { row };
            let row_values = rows.get(r)?;
            let c = if row_values.len() == 1 { 0 } else { col };
            row_values.get(c)
        }
        scalar => Some(scalar),
    }
}

/// Fit an array-formula result to its target rectangle
fn broadcast(value: Value, rows: u32, cols: u16) -> Value {
    let mut out = Vec::with_capacity(rows as usize);
    for r in 0..rows as usize {
        let mut row = Vec::with_capacity(cols as usize);
        for c in 0..cols as usize {
            row.push(
                element_at(&value, r, c)
                    .cloned()
                    .unwrap_or(Value::Error(CellError::Na)),
            );
        }
        out.push(row);
    }
    Value::Array(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_binary_arithmetic() {
        let v = binary_values(BinaryOp::Add, &Value::Number(2.0), &Value::Number(3.0));
        assert_eq!(v, Value::Number(5.0));
        let v = binary_values(BinaryOp::Div, &Value::Number(1.0), &Value::Number(0.0));
        assert_eq!(v, Value::Error(CellError::Div0));
    }

    #[test]
    fn test_binary_coercion() {
        let v = binary_values(BinaryOp::Add, &Value::Text(" 4 ".into()), &Value::Blank);
        assert_eq!(v, Value::Number(4.0));
        let v = binary_values(BinaryOp::Mul, &Value::Text("x".into()), &Value::Number(2.0));
        assert_eq!(v, Value::Error(CellError::Value));
    }

    #[test]
    fn test_error_wins_left_first() {
        let v = binary_values(
            BinaryOp::Add,
            &Value::Error(CellError::Ref),
            &Value::Error(CellError::Div0),
        );
        assert_eq!(v, Value::Error(CellError::Ref));
    }

    #[test]
    fn test_concat() {
        let v = binary_values(
            BinaryOp::Concat,
            &Value::Number(1.0),
            &Value::Text("x".into()),
        );
        assert_eq!(v, Value::Text("1x".into()));
    }

    #[test]
    fn test_comparisons_are_case_insensitive() {
        let v = binary_values(
            BinaryOp::Eq,
            &Value::Text("ABC".into()),
            &Value::Text("abc".into()),
        );
        assert_eq!(v, Value::Bool(true));
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            unary_value(UnaryOp::Neg, &Value::Number(4.0)),
            Value::Number(-4.0)
        );
        assert_eq!(
            unary_value(UnaryOp::Percent, &Value::Number(50.0)),
            Value::Number(0.5)
        );
        assert_eq!(
            unary_value(UnaryOp::Plus, &Value::Text("x".into())),
            Value::Text("x".into())
        );
    }

    #[test]
    fn test_elementwise_broadcast() {
        let a = Value::Array(vec![
            vec![Value::Number(1.0), Value::Number(2.0)],
            vec![Value::Number(3.0), Value::Number(4.0)],
        ]);
        let v = binary_values(BinaryOp::Mul, &a, &Value::Number(10.0));
        assert_eq!(
            v,
            Value::Array(vec![
                vec![Value::Number(10.0), Value::Number(20.0)],
                vec![Value::Number(30.0), Value::Number(40.0)],
            ])
        );
    }

    #[test]
    fn test_range_op_bounding_box() {
        let a = Operand::Ref {
            sheet: 0,
            row: 0,
            col: 0,
        };
        let b = Operand::Ref {
            sheet: 0,
            row: 4,
            col: 2,
        };
        let Operand::Area { range, .. } = range_op(a, b) else {
            panic!("expected area");
        };
        assert_eq!(range, CellRange::parse("A1:C5").unwrap());
    }

    #[test]
    fn test_intersect_disjoint_is_null_error() {
        let a = Operand::Area {
            first_sheet: 0,
            last_sheet: 0,
            range: CellRange::parse("A1:B2").unwrap(),
        };
        let b = Operand::Area {
            first_sheet: 0,
            last_sheet: 0,
            range: CellRange::parse("D4:E5").unwrap(),
        };
        let Operand::Value(v) = intersect_op(a, b) else {
            panic!("expected value");
        };
        assert_eq!(v, Value::Error(CellError::Null));
    }
}
