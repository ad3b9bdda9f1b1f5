// ABOUTME: Math built-ins (§6): abs/round/floor/ceil/sqrt/pow/log/log10 and
// ABOUTME: the trigonometric family, all operating on doubles.

use crate::error::EvalError;
use crate::value::Value;
use aviator_macros::builtin;

fn as_f64(v: &Value, fname: &str, pos: usize) -> Result<f64, EvalError> {
    match v {
        Value::Long(n) => Ok(*n as f64),
        Value::Double(d) => Ok(*d),
        Value::BigInt(b) => num_traits::ToPrimitive::to_f64(b.as_ref())
            .ok_or_else(|| EvalError::runtime_error(fname, "bigint has no finite double representation")),
        other => Err(EvalError::type_error(fname, "number", other, pos)),
    }
}

fn unary(args: &[Value], fname: &'static str, f: impl FnOnce(f64) -> f64) -> Result<Value, EvalError> {
    let v = args.first().ok_or_else(|| EvalError::arity_error(fname, "1", args.len()))?;
    Ok(Value::Double(f(as_f64(v, fname, 1)?)))
}

#[builtin(name = "math.abs", category = "math", returns = "double")]
fn math_abs(args: &[Value]) -> Result<Value, EvalError> {
    match args.first() {
        Some(Value::Long(n)) => Ok(Value::Long(n.abs())),
        _ => unary(args, "math.abs", f64::abs),
    }
}

#[builtin(name = "math.round", category = "math", returns = "long")]
fn math_round(args: &[Value]) -> Result<Value, EvalError> {
    let v = args.first().ok_or_else(|| EvalError::arity_error("math.round", "1", args.len()))?;
    Ok(Value::Long(as_f64(v, "math.round", 1)?.round() as i64))
}

#[builtin(name = "math.floor", category = "math", returns = "double")]
fn math_floor(args: &[Value]) -> Result<Value, EvalError> {
    unary(args, "math.floor", f64::floor)
}

#[builtin(name = "math.ceil", category = "math", returns = "double")]
fn math_ceil(args: &[Value]) -> Result<Value, EvalError> {
    unary(args, "math.ceil", f64::ceil)
}

#[builtin(name = "math.sqrt", category = "math", returns = "double")]
fn math_sqrt(args: &[Value]) -> Result<Value, EvalError> {
    unary(args, "math.sqrt", f64::sqrt)
}

#[builtin(name = "math.pow", category = "math", returns = "double")]
fn math_pow(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("math.pow", "2", args.len()));
    }
    let base = as_f64(&args[0], "math.pow", 1)?;
    let exp = as_f64(&args[1], "math.pow", 2)?;
    Ok(Value::Double(base.powf(exp)))
}

#[builtin(name = "math.log", category = "math", returns = "double")]
fn math_log(args: &[Value]) -> Result<Value, EvalError> {
    unary(args, "math.log", f64::ln)
}

#[builtin(name = "math.log10", category = "math", returns = "double")]
fn math_log10(args: &[Value]) -> Result<Value, EvalError> {
    unary(args, "math.log10", f64::log10)
}

#[builtin(name = "math.sin", category = "math", returns = "double")]
fn math_sin(args: &[Value]) -> Result<Value, EvalError> {
    unary(args, "math.sin", f64::sin)
}

#[builtin(name = "math.cos", category = "math", returns = "double")]
fn math_cos(args: &[Value]) -> Result<Value, EvalError> {
    unary(args, "math.cos", f64::cos)
}

#[builtin(name = "math.tan", category = "math", returns = "double")]
fn math_tan(args: &[Value]) -> Result<Value, EvalError> {
    unary(args, "math.tan", f64::tan)
}

#[builtin(name = "math.asin", category = "math", returns = "double")]
fn math_asin(args: &[Value]) -> Result<Value, EvalError> {
    unary(args, "math.asin", f64::asin)
}

#[builtin(name = "math.acos", category = "math", returns = "double")]
fn math_acos(args: &[Value]) -> Result<Value, EvalError> {
    unary(args, "math.acos", f64::acos)
}

#[builtin(name = "math.atan", category = "math", returns = "double")]
fn math_atan(args: &[Value]) -> Result<Value, EvalError> {
    unary(args, "math.atan", f64::atan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_preserves_long_representation() {
        assert!(matches!(math_abs(&[Value::Long(-5)]), Ok(Value::Long(5))));
    }

    #[test]
    fn abs_on_double_stays_double() {
        assert!(matches!(math_abs(&[Value::Double(-2.5)]), Ok(Value::Double(d)) if d == 2.5));
    }

    #[test]
    fn round_returns_long() {
        assert!(matches!(math_round(&[Value::Double(2.6)]), Ok(Value::Long(3))));
    }

    #[test]
    fn sqrt_of_four_is_two() {
        assert!(matches!(math_sqrt(&[Value::Long(4)]), Ok(Value::Double(d)) if d == 2.0));
    }

    #[test]
    fn pow_matches_exponent_builtin_semantics() {
        assert!(matches!(math_pow(&[Value::Long(2), Value::Long(10)]), Ok(Value::Double(d)) if d == 1024.0));
    }
}
