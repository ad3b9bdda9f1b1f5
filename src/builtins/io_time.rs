// ABOUTME: I/O and time built-ins (§6): print/println/p, sysdate/now, rand.

use crate::error::EvalError;
use crate::value::Value;
use aviator_macros::builtin;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

#[builtin(name = "print", category = "io_time", returns = "nil")]
fn print_fn(args: &[Value]) -> Result<Value, EvalError> {
    for a in args {
        print!("{a}");
    }
    Ok(Value::Nil)
}

#[builtin(name = "println", category = "io_time", returns = "nil")]
fn println_fn(args: &[Value]) -> Result<Value, EvalError> {
    let rendered = args.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
    println!("{rendered}");
    Ok(Value::Nil)
}

/// Debug-prints every argument and returns the last one unchanged, so `p(x)`
/// can be dropped into the middle of an expression without disturbing it.
#[builtin(name = "p", category = "io_time", returns = "any")]
fn p_fn(args: &[Value]) -> Result<Value, EvalError> {
    for a in args {
        println!("{a:?}");
    }
    Ok(args.last().cloned().unwrap_or(Value::Nil))
}

#[builtin(name = "sysdate", category = "io_time", returns = "long")]
fn sysdate(_args: &[Value]) -> Result<Value, EvalError> {
    epoch_seconds()
}

#[builtin(name = "now", category = "io_time", returns = "long")]
fn now(_args: &[Value]) -> Result<Value, EvalError> {
    epoch_millis()
}

fn epoch_seconds() -> Result<Value, EvalError> {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| EvalError::runtime_error("sysdate", "system clock is before the Unix epoch"))?;
    Ok(Value::Long(dur.as_secs() as i64))
}

fn epoch_millis() -> Result<Value, EvalError> {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| EvalError::runtime_error("now", "system clock is before the Unix epoch"))?;
    Ok(Value::Long(dur.as_millis() as i64))
}

/// `rand()` yields a double in `[0, 1)`; `rand(n)` yields a long in
/// `[0, n)`; `rand(a, b)` yields a long in `[a, b)`.
#[builtin(name = "rand", category = "io_time", returns = "any")]
fn rand_fn(args: &[Value]) -> Result<Value, EvalError> {
    let mut rng = rand::thread_rng();
    match args.len() {
        0 => Ok(Value::Double(rng.gen::<f64>())),
        1 => {
            let bound = as_long(&args[0], 1)?;
            if bound <= 0 {
                return Err(EvalError::runtime_error("rand", "upper bound must be positive"));
            }
            Ok(Value::Long(rng.gen_range(0..bound)))
        }
        2 => {
            let lo = as_long(&args[0], 1)?;
            let hi = as_long(&args[1], 2)?;
            if lo >= hi {
                return Err(EvalError::runtime_error("rand", "lower bound must be less than upper bound"));
            }
            Ok(Value::Long(rng.gen_range(lo..hi)))
        }
        n => Err(EvalError::arity_error("rand", "0-2", n)),
    }
}

fn as_long(v: &Value, pos: usize) -> Result<i64, EvalError> {
    match v {
        Value::Long(n) => Ok(*n),
        Value::Double(d) if d.fract() == 0.0 => Ok(*d as i64),
        other => Err(EvalError::type_error("rand", "long", other, pos)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rand_with_no_args_is_in_unit_interval() {
        match rand_fn(&[]).unwrap() {
            Value::Double(d) => assert!((0.0..1.0).contains(&d)),
            _ => panic!("expected double"),
        }
    }

    #[test]
    fn rand_with_one_arg_is_bounded() {
        for _ in 0..20 {
            match rand_fn(&[Value::Long(5)]).unwrap() {
                Value::Long(n) => assert!((0..5).contains(&n)),
                _ => panic!("expected long"),
            }
        }
    }

    #[test]
    fn rand_rejects_inverted_range() {
        assert!(rand_fn(&[Value::Long(5), Value::Long(1)]).is_err());
    }

    #[test]
    fn now_is_after_sysdate_scaled_to_millis() {
        let secs = match sysdate(&[]).unwrap() {
            Value::Long(n) => n,
            _ => panic!("expected long"),
        };
        let millis = match now(&[]).unwrap() {
            Value::Long(n) => n,
            _ => panic!("expected long"),
        };
        assert!(millis >= secs * 1000);
    }
}
