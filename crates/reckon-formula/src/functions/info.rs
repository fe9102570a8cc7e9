//! Type inspection functions
//!
//! These look at the value as-is; errors in the argument are a result,
//! not a failure, so nothing propagates.

use crate::error::EvalResult;
use crate::evaluator::{FunctionContext, Operand};
use crate::value::Value;
use reckon_core::CellError;

/// ISBLANK function
pub fn fn_isblank(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let v = ctx.value(&args[0])?;
    Ok(Value::Bool(v.is_blank()))
}

/// ISNUMBER function
pub fn fn_isnumber(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let v = ctx.value(&args[0])?;
    Ok(Value::Bool(matches!(v, Value::Number(_))))
}

/// ISTEXT function
pub fn fn_istext(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let v = ctx.value(&args[0])?;
    Ok(Value::Bool(matches!(v, Value::Text(_))))
}

/// ISLOGICAL function
pub fn fn_islogical(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let v = ctx.value(&args[0])?;
    Ok(Value::Bool(matches!(v, Value::Bool(_))))
}

/// ISERROR function
pub fn fn_iserror(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let v = ctx.value(&args[0])?;
    Ok(Value::Bool(matches!(v, Value::Error(_))))
}

/// ISNA function
pub fn fn_isna(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let v = ctx.value(&args[0])?;
    Ok(Value::Bool(matches!(v, Value::Error(CellError::Na))))
}

/// NA function
pub fn fn_na(_args: &[Operand], _ctx: &mut FunctionContext) -> EvalResult<Value> {
    Ok(Value::Error(CellError::Na))
}
