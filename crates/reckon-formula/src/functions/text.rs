//! Text functions
//!
//! Positions and lengths count characters, not bytes.

use crate::error::EvalResult;
use crate::evaluator::{FunctionContext, Operand};
use crate::value::Value;
use reckon_core::CellError;

/// LEN function
pub fn fn_len(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    match textual(ctx.value(&args[0])?) {
        Ok(s) => Ok(Value::Number(s.chars().count() as f64)),
        Err(e) => Ok(Value::Error(e)),
    }
}

/// LEFT function
pub fn fn_left(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let s = match textual(ctx.value(&args[0])?) {
        Ok(s) => s,
        Err(e) => return Ok(Value::Error(e)),
    };
    let count = match optional_count(args, 1, ctx)? {
        Ok(n) => n,
        Err(e) => return Ok(Value::Error(e)),
    };

    Ok(Value::Text(s.chars().take(count).collect()))
}

/// RIGHT function
pub fn fn_right(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let s = match textual(ctx.value(&args[0])?) {
        Ok(s) => s,
        Err(e) => return Ok(Value::Error(e)),
    };
    let count = match optional_count(args, 1, ctx)? {
        Ok(n) => n,
        Err(e) => return Ok(Value::Error(e)),
    };

    let len = s.chars().count();
    Ok(Value::Text(s.chars().skip(len.saturating_sub(count)).collect()))
}

/// MID function - start is 1-based
pub fn fn_mid(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let s = match textual(ctx.value(&args[0])?) {
        Ok(s) => s,
        Err(e) => return Ok(Value::Error(e)),
    };
    let start = match numeric(ctx.value(&args[1])?) {
        Ok(n) => n,
        Err(e) => return Ok(Value::Error(e)),
    };
    let count = match numeric(ctx.value(&args[2])?) {
        Ok(n) => n,
        Err(e) => return Ok(Value::Error(e)),
    };

    if start < 1.0 || count < 0.0 {
        return Ok(Value::Error(CellError::Value));
    }
    let start = start.trunc() as usize - 1;
    let count = count.trunc() as usize;
    Ok(Value::Text(s.chars().skip(start).take(count).collect()))
}

/// UPPER function
pub fn fn_upper(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    match textual(ctx.value(&args[0])?) {
        Ok(s) => Ok(Value::Text(s.to_uppercase())),
        Err(e) => Ok(Value::Error(e)),
    }
}

/// LOWER function
pub fn fn_lower(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    match textual(ctx.value(&args[0])?) {
        Ok(s) => Ok(Value::Text(s.to_lowercase())),
        Err(e) => Ok(Value::Error(e)),
    }
}

/// TRIM function - strips leading/trailing spaces and collapses runs
pub fn fn_trim(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    match textual(ctx.value(&args[0])?) {
        Ok(s) => {
            let trimmed: Vec<&str> = s.split(' ').filter(|part| !part.is_empty()).collect();
            Ok(Value::Text(trimmed.join(" ")))
        }
        Err(e) => Ok(Value::Error(e)),
    }
}

/// CONCATENATE function
pub fn fn_concatenate(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let mut out = String::new();

    for arg in args {
        for v in ctx.values(arg)? {
            match textual(v) {
                Ok(s) => out.push_str(&s),
                Err(e) => return Ok(Value::Error(e)),
            }
        }
    }

    Ok(Value::Text(out))
}

fn textual(v: Value) -> Result<String, CellError> {
    match v {
        Value::Error(e) => Err(e),
        other => other.coerce_text(),
    }
}

fn numeric(v: Value) -> Result<f64, CellError> {
    match v {
        Value::Error(e) => Err(e),
        other => other.coerce_number(),
    }
}

/// A missing count argument defaults to one character.
fn optional_count(
    args: &[Operand],
    index: usize,
    ctx: &mut FunctionContext,
) -> EvalResult<Result<usize, CellError>> {
    if args.len() <= index {
        return Ok(Ok(1));
    }
    match numeric(ctx.value(&args[index])?) {
        Ok(n) if n < 0.0 => Ok(Err(CellError::Value)),
        Ok(n) => Ok(Ok(n.trunc() as usize)),
        Err(e) => Ok(Err(e)),
    }
}
