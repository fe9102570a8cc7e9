//! Math functions

use crate::error::EvalResult;
use crate::evaluator::{FunctionContext, Operand};
use crate::value::Value;
use reckon_core::CellError;

/// SUM function
pub fn fn_sum(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let mut sum = 0.0;

    for arg in args {
        for v in ctx.values(arg)? {
            match v {
                Value::Number(n) => sum += n,
                Value::Error(e) => return Ok(Value::Error(e)),
                _ => {} // Ignore non-numeric
            }
        }
    }

    Ok(Value::Number(sum))
}

/// ABS function
pub fn fn_abs(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    unary_numeric(ctx.value(&args[0])?, f64::abs)
}

/// SIGN function
pub fn fn_sign(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    unary_numeric(ctx.value(&args[0])?, |n| {
        if n > 0.0 {
            1.0
        } else if n < 0.0 {
            -1.0
        } else {
            0.0
        }
    })
}

/// INT function - rounds down to the nearest integer
pub fn fn_int(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    unary_numeric(ctx.value(&args[0])?, f64::floor)
}

/// SQRT function
pub fn fn_sqrt(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    match numeric(ctx.value(&args[0])?) {
        Ok(n) if n < 0.0 => Ok(Value::Error(CellError::Num)),
        Ok(n) => Ok(Value::Number(n.sqrt())),
        Err(e) => Ok(Value::Error(e)),
    }
}

/// ROUND function - half away from zero
pub fn fn_round(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let n = match numeric(ctx.value(&args[0])?) {
        Ok(n) => n,
        Err(e) => return Ok(Value::Error(e)),
    };
    let digits = if args.len() > 1 {
        match numeric(ctx.value(&args[1])?) {
            Ok(d) => d.trunc() as i32,
            Err(e) => return Ok(Value::Error(e)),
        }
    } else {
        0
    };

    let factor = 10f64.powi(digits);
    let rounded = (n * factor).round() / factor;
    if rounded.is_finite() {
        Ok(Value::Number(rounded))
    } else {
        Ok(Value::Error(CellError::Num))
    }
}

/// MOD function - result takes the sign of the divisor
pub fn fn_mod(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let a = match numeric(ctx.value(&args[0])?) {
        Ok(n) => n,
        Err(e) => return Ok(Value::Error(e)),
    };
    let b = match numeric(ctx.value(&args[1])?) {
        Ok(n) => n,
        Err(e) => return Ok(Value::Error(e)),
    };

    if b == 0.0 {
        return Ok(Value::Error(CellError::Div0));
    }
    Ok(Value::Number(a - b * (a / b).floor()))
}

/// POWER function
pub fn fn_power(args: &[Operand], ctx: &mut FunctionContext) -> EvalResult<Value> {
    let base = match numeric(ctx.value(&args[0])?) {
        Ok(n) => n,
        Err(e) => return Ok(Value::Error(e)),
    };
    let exp = match numeric(ctx.value(&args[1])?) {
        Ok(n) => n,
        Err(e) => return Ok(Value::Error(e)),
    };

    let result = base.powf(exp);
    if result.is_finite() {
        Ok(Value::Number(result))
    } else {
        Ok(Value::Error(CellError::Num))
    }
}

/// PI function
pub fn fn_pi(_args: &[Operand], _ctx: &mut FunctionContext) -> EvalResult<Value> {
    Ok(Value::Number(std::f64::consts::PI))
}

/// RAND() - Returns a random number between 0 and 1
///
/// Volatile: a different value on each calculation.
pub fn fn_rand(_args: &[Operand], _ctx: &mut FunctionContext) -> EvalResult<Value> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    Ok(Value::Number(rng.gen::<f64>()))
}

fn numeric(v: Value) -> Result<f64, CellError> {
    match v {
        Value::Error(e) => Err(e),
        other => other.coerce_number(),
    }
}

/// Apply a numeric function, recursing elementwise into arrays.
fn unary_numeric(v: Value, f: fn(f64) -> f64) -> EvalResult<Value> {
    match v {
        Value::Array(rows) => {
            let mut out = Vec::with_capacity(rows.len());
            for row in rows {
                let mut cells = Vec::with_capacity(row.len());
                for cell in row {
                    cells.push(unary_numeric(cell, f)?);
                }
                out.push(cells);
            }
            Ok(Value::Array(out))
        }
        other => match numeric(other) {
            Ok(n) => {
                let r = f(n);
                if r.is_finite() {
                    Ok(Value::Number(r))
                } else {
                    Ok(Value::Error(CellError::Num))
                }
            }
            Err(e) => Ok(Value::Error(e)),
        },
    }
}
