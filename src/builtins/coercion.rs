// ABOUTME: Coercion and reflection built-ins (§6): long/double/boolean/str
// ABOUTME: conversions plus identity/type/is_def/cmp for introspection.

use crate::error::{EvalError, ARITY_ONE, ARITY_TWO};
use crate::interpreter::compare_values;
use crate::value::Value;
use aviator_macros::builtin;
use num_traits::ToPrimitive;

fn arg(args: &[Value], fname: &str, i: usize) -> Result<&Value, EvalError> {
    args.get(i).ok_or_else(|| EvalError::arity_error(fname, ARITY_ONE, args.len()))
}

#[builtin(name = "long", category = "coercion", returns = "long")]
fn long(args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, "long", 0)? {
        Value::Long(n) => Ok(Value::Long(*n)),
        Value::Double(d) => Ok(Value::Long(*d as i64)),
        Value::BigInt(b) => b
            .to_i64()
            .map(Value::Long)
            .ok_or_else(|| EvalError::runtime_error("long", "bigint is out of i64 range")),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Long)
            .map_err(|_| EvalError::runtime_error("long", "cannot parse as long")),
        Value::Boolean(b) => Ok(Value::Long(if *b { 1 } else { 0 })),
        other => Err(EvalError::type_error("long", "number-like", other, 1)),
    }
}

#[builtin(name = "double", category = "coercion", returns = "double")]
fn double(args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, "double", 0)? {
        Value::Long(n) => Ok(Value::Double(*n as f64)),
        Value::Double(d) => Ok(Value::Double(*d)),
        Value::BigInt(b) => b
            .to_f64()
            .map(Value::Double)
            .ok_or_else(|| EvalError::runtime_error("double", "bigint has no finite double representation")),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| EvalError::runtime_error("double", "cannot parse as double")),
        Value::Boolean(b) => Ok(Value::Double(if *b { 1.0 } else { 0.0 })),
        other => Err(EvalError::type_error("double", "number-like", other, 1)),
    }
}

#[builtin(name = "boolean", category = "coercion", returns = "boolean")]
fn boolean(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Boolean(arg(args, "boolean", 0)?.is_truthy()))
}

#[builtin(name = "str", category = "coercion", returns = "string")]
fn str_fn(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Str(arg(args, "str", 0)?.to_string().into()))
}

#[builtin(name = "identity", category = "coercion", returns = "any")]
fn identity(args: &[Value]) -> Result<Value, EvalError> {
    Ok(arg(args, "identity", 0)?.clone())
}

#[builtin(name = "type", category = "coercion", returns = "string")]
fn type_of(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Str(arg(args, "type", 0)?.type_name().into()))
}

#[builtin(name = "is_def", category = "coercion", returns = "boolean")]
fn is_def(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Boolean(!matches!(arg(args, "is_def", 0)?, Value::Undefined)))
}

#[builtin(name = "cmp", category = "coercion", returns = "long")]
fn cmp(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("cmp", ARITY_TWO, args.len()));
    }
    let ordering = compare_values(&args[0], &args[1])?;
    Ok(Value::Long(match ordering {
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
        std::cmp::Ordering::Greater => 1,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_parses_numeric_strings() {
        assert!(matches!(long(&[Value::Str("42".into())]), Ok(Value::Long(42))));
    }

    #[test]
    fn type_of_reports_catalog_names() {
        assert!(matches!(type_of(&[Value::Long(1)]), Ok(Value::Str(s)) if &*s == "long"));
    }

    #[test]
    fn cmp_orders_numbers() {
        assert!(matches!(cmp(&[Value::Long(1), Value::Long(2)]), Ok(Value::Long(-1))));
        assert!(matches!(cmp(&[Value::Long(2), Value::Long(2)]), Ok(Value::Long(0))));
    }

    #[test]
    fn is_def_distinguishes_undefined() {
        assert!(matches!(is_def(&[Value::Nil]), Ok(Value::Boolean(true))));
        assert!(matches!(is_def(&[Value::Undefined]), Ok(Value::Boolean(false))));
    }
}
