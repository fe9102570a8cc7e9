//! Logical functions

use crate::error::EvalResult;
use crate::evaluator::{FunctionContext, Operand};
use crate::value::Value;
use reckon_core::CellError;

/// IF function
///
/// In scalar formulas the interpreter short-circuits IF before this body
/// runs, so the branch not taken is never dereferenced. This implementation
/// is reached in array formulas and in the two-argument FALSE case, where
/// the interpreter supplies the condition plus a literal FALSE.
pub fn fn_if(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let cond = ctx.value(&args[0])?;

    if let Value::Array(_) = cond {
        return elementwise_if(cond, args, ctx);
    }
    if let Value::Error(e) = cond {
        return Ok(Value::Error(e));
    }

    match cond.coerce_bool() {
        Ok(true) => ctx.value(&args[1]).map(default_blank),
        Ok(false) => {
            if args.len() > 2 {
                ctx.value(&args[2]).map(default_blank)
            } else {
                Ok(Value::Bool(false))
            }
        }
        Err(e) => Ok(Value::Error(e)),
    }
}

/// Array-mode IF: pick per element, broadcasting scalar branches.
fn elementwise_if(
    cond: Value,
    args: &[Operand],
    ctx: &mut FunctionContext,
) -> EvalResult<Value> {
    let Value::Array(cond_rows) = cond else {
        return Ok(Value::Error(CellError::Value));
    };
    let when_true = ctx.value(&args[1])?;
    let when_false = if args.len() > 2 {
        ctx.value(&args[2])?
    } else {
        Value::Bool(false)
    };

    let mut rows = Vec::with_capacity(cond_rows.len());
    for (r, cond_row) in cond_rows.iter().enumerate() {
        let mut cells = Vec::with_capacity(cond_row.len());
        for (c, cell) in cond_row.iter().enumerate() {
            let picked = match cell {
                Value::Error(e) => Value::Error(*e),
                other => match other.coerce_bool() {
                    Ok(true) => element_or_scalar(&when_true, r, c),
                    Ok(false) => element_or_scalar(&when_false, r, c),
                    Err(e) => Value::Error(e),
                },
            };
            cells.push(default_blank(picked));
        }
        rows.push(cells);
    }
    Ok(Value::Array(rows))
}

fn element_or_scalar(v: &Value, row: usize, col: usize) -> Value {
    match v {
        Value::Array(rows) => {
            let r = if rows.len() == 1 { 0 } else { row };
            match rows.get(r) {
                Some(cells) => {
                    let c = if cells.len() == 1 { 0 } else { col };
                    cells.get(c).cloned().unwrap_or(Value::Error(CellError::Na))
                }
                None => Value::Error(CellError::Na),
            }
        }
        other => other.clone(),
    }
}

/// A branch that evaluates to blank shows as 0, matching `=IF(1,,2)`.
fn default_blank(v: Value) -> Value {
    if v.is_blank() {
        Value::Number(0.0)
    } else {
        v
    }
}

/// AND function
pub fn fn_and(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    fold_logical(args, ctx, true, |acc, b| acc && b)
}

/// OR function
pub fn fn_or(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    fold_logical(args, ctx, false, |acc, b| acc || b)
}

/// XOR function
pub fn fn_xor(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    fold_logical(args, ctx, false, |acc, b| acc ^ b)
}

/// Fold booleans across every argument. Text and blanks inside ranges are
/// skipped; a range with nothing usable at all is `#VALUE!`.
fn fold_logical(
    args: &[Operand],
    ctx: &mut FunctionContext,
    init: bool,
    fold: fn(bool, bool) -> bool,
) -> EvalResult<Value> {
    let mut acc = init;
    let mut seen = false;

    for arg in args {
        for v in ctx.values(arg)? {
            match v {
                Value::Error(e) => return Ok(Value::Error(e)),
                Value::Bool(b) => {
                    acc = fold(acc, b);
                    seen = true;
                }
                Value::Number(n) => {
                    acc = fold(acc, n != 0.0);
                    seen = true;
                }
                _ => {}
            }
        }
    }

    if seen {
        Ok(Value::Bool(acc))
    } else {
        Ok(Value::Error(CellError::Value))
    }
}

/// NOT function
pub fn fn_not(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    match ctx.value(&args[0])? {
        Value::Error(e) => Ok(Value::Error(e)),
        v => match v.coerce_bool() {
            Ok(b) => Ok(Value::Bool(!b)),
            Err(e) => Ok(Value::Error(e)),
        },
    }
}

/// IFERROR function
///
/// The fallback argument is only dereferenced when the first errors.
pub fn fn_iferror(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    match ctx.value(&args[0])? {
        Value::Error(_) => ctx.value(&args[1]),
        v => Ok(v),
    }
}

/// IFNA function
pub fn fn_ifna(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    match ctx.value(&args[0])? {
        Value::Error(CellError::Na) => ctx.value(&args[1]),
        v => Ok(v),
    }
}

/// TRUE function
pub fn fn_true(_args: &[Operand], _ctx: &mut FunctionContext) -> EvalResult<Value> {
    Ok(Value::Bool(true))
}

/// FALSE function
pub fn fn_false(_args: &[Operand], _ctx: &mut FunctionContext) -> EvalResult<Value> {
    Ok(Value::Bool(false))
}
