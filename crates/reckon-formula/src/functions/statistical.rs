//! Statistical functions

use crate::error::EvalResult;
use crate::evaluator::{FunctionContext, Operand};
use crate::value::Value;
use reckon_core::CellError;

/// AVERAGE function
pub fn fn_average(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let mut sum = 0.0;
    let mut count = 0u64;

    for arg in args {
        for v in ctx.values(arg)? {
            match v {
                Value::Number(n) => {
                    sum += n;
                    count += 1;
                }
                Value::Error(e) => return Ok(Value::Error(e)),
                _ => {} // Ignore non-numeric
            }
        }
    }

    if count == 0 {
        Ok(Value::Error(CellError::Div0))
    } else {
        Ok(Value::Number(sum / count as f64))
    }
}

/// COUNT function - counts numbers only
pub fn fn_count(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let mut count = 0u64;

    for arg in args {
        for v in ctx.values(arg)? {
            if matches!(v, Value::Number(_)) {
                count += 1;
            }
        }
    }

    Ok(Value::Number(count as f64))
}

/// COUNTA function - counts anything non-blank, errors included
pub fn fn_counta(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let mut count = 0u64;

    for arg in args {
        for v in ctx.values(arg)? {
            if !v.is_blank() {
                count += 1;
            }
        }
    }

    Ok(Value::Number(count as f64))
}

/// MIN function
pub fn fn_min(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    extremum(args, ctx, f64::min)
}

/// MAX function
pub fn fn_max(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    extremum(args, ctx, f64::max)
}

/// MIN/MAX over every numeric value; no numbers at all yields 0.
fn extremum(
    args: &[Operand],
    ctx: &mut FunctionContext,
    pick: fn(f64, f64) -> f64,
) -> EvalResult<Value> {
    let mut best: Option<f64> = None;

    for arg in args {
        for v in ctx.values(arg)? {
            match v {
                Value::Number(n) => {
                    best = Some(best.map_or(n, |b| pick(b, n)));
                }
                Value::Error(e) => return Ok(Value::Error(e)),
                _ => {} // Ignore non-numeric
            }
        }
    }

    Ok(Value::Number(best.unwrap_or(0.0)))
}
