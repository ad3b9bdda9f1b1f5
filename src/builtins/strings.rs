// ABOUTME: String built-ins (§6): length/contains/startsWith/endsWith,
// ABOUTME: substring/indexOf/split/join, and regex-based replace.

use crate::config::MAX_STRING_OP_LEN;
use crate::error::{EvalError, ARITY_THREE, ARITY_TWO, ARITY_TWO_OR_THREE};
use crate::value::Value;
use aviator_macros::builtin;
use std::rc::Rc;

fn as_str<'a>(v: &'a Value, fname: &str, pos: usize) -> Result<&'a str, EvalError> {
    match v {
        Value::Str(s) if s.len() > MAX_STRING_OP_LEN => {
            Err(EvalError::runtime_error(fname, "input string exceeds the maximum operand length"))
        }
        Value::Str(s) => Ok(s),
        other => Err(EvalError::type_error(fname, "string", other, pos)),
    }
}

fn as_regex<'a>(v: &'a Value, fname: &str, pos: usize) -> Result<&'a regex::Regex, EvalError> {
    match v {
        Value::Regex(r) => Ok(r),
        other => Err(EvalError::type_error(fname, "pattern", other, pos)),
    }
}

fn as_long(v: &Value, fname: &str, pos: usize) -> Result<i64, EvalError> {
    match v {
        Value::Long(n) => Ok(*n),
        Value::Double(d) if d.fract() == 0.0 => Ok(*d as i64),
        other => Err(EvalError::type_error(fname, "long", other, pos)),
    }
}

#[builtin(name = "string.length", category = "strings", returns = "long")]
fn string_length(args: &[Value]) -> Result<Value, EvalError> {
    let s = as_str(args.first().ok_or_else(|| EvalError::arity_error("string.length", "1", args.len()))?, "string.length", 1)?;
    Ok(Value::Long(s.chars().count() as i64))
}

#[builtin(name = "string.contains", category = "strings", returns = "boolean")]
fn string_contains(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("string.contains", ARITY_TWO, args.len()));
    }
    let s = as_str(&args[0], "string.contains", 1)?;
    let needle = as_str(&args[1], "string.contains", 2)?;
    Ok(Value::Boolean(s.contains(needle)))
}

#[builtin(name = "string.startsWith", category = "strings", returns = "boolean")]
fn string_starts_with(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("string.startsWith", ARITY_TWO, args.len()));
    }
    let s = as_str(&args[0], "string.startsWith", 1)?;
    let prefix = as_str(&args[1], "string.startsWith", 2)?;
    Ok(Value::Boolean(s.starts_with(prefix)))
}

#[builtin(name = "string.endsWith", category = "strings", returns = "boolean")]
fn string_ends_with(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("string.endsWith", ARITY_TWO, args.len()));
    }
    let s = as_str(&args[0], "string.endsWith", 1)?;
    let suffix = as_str(&args[1], "string.endsWith", 2)?;
    Ok(Value::Boolean(s.ends_with(suffix)))
}

#[builtin(name = "string.substring", category = "strings", returns = "string")]
fn string_substring(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(EvalError::arity_error("string.substring", ARITY_TWO_OR_THREE, args.len()));
    }
    let s = as_str(&args[0], "string.substring", 1)?;
    let chars: Vec<char> = s.chars().collect();
    let begin = as_long(&args[1], "string.substring", 2)?.clamp(0, chars.len() as i64) as usize;
    let end = if args.len() == 3 {
        as_long(&args[2], "string.substring", 3)?.clamp(begin as i64, chars.len() as i64) as usize
    } else {
        chars.len()
    };
    Ok(Value::Str(chars[begin..end].iter().collect::<String>().into()))
}

#[builtin(name = "string.indexOf", category = "strings", returns = "long")]
fn string_index_of(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("string.indexOf", ARITY_TWO, args.len()));
    }
    let s = as_str(&args[0], "string.indexOf", 1)?;
    let needle = as_str(&args[1], "string.indexOf", 2)?;
    match s.find(needle) {
        Some(byte_idx) => Ok(Value::Long(s[..byte_idx].chars().count() as i64)),
        None => Ok(Value::Long(-1)),
    }
}

#[builtin(name = "string.split", category = "strings", returns = "list")]
fn string_split(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(EvalError::arity_error("string.split", ARITY_TWO_OR_THREE, args.len()));
    }
    let s = as_str(&args[0], "string.split", 1)?;
    let re = as_regex(&args[1], "string.split", 2)?;
    let limit = if args.len() == 3 { as_long(&args[2], "string.split", 3)? } else { 0 };
    let parts: Vec<&str> = if limit > 0 {
        re.splitn(s, limit as usize).collect()
    } else {
        re.split(s).collect()
    };
    Ok(Value::List(Rc::new(std::cell::RefCell::new(
        parts.into_iter().map(|p| Value::Str(p.into())).collect(),
    ))))
}

#[builtin(name = "string.join", category = "strings", returns = "string")]
fn string_join(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("string.join", ARITY_TWO, args.len()));
    }
    let sep = as_str(&args[1], "string.join", 2)?;
    let list = match &args[0] {
        Value::List(l) => l.borrow().iter().map(|v| v.to_string()).collect::<Vec<_>>(),
        other => return Err(EvalError::type_error("string.join", "list", other, 1)),
    };
    Ok(Value::Str(list.join(sep).into()))
}

#[builtin(name = "string.replace_first", category = "strings", returns = "string")]
fn string_replace_first(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 3 {
        return Err(EvalError::arity_error("string.replace_first", ARITY_THREE, args.len()));
    }
    let s = as_str(&args[0], "string.replace_first", 1)?;
    let re = as_regex(&args[1], "string.replace_first", 2)?;
    let replacement = as_str(&args[2], "string.replace_first", 3)?;
    Ok(Value::Str(re.replacen(s, 1, replacement).into_owned().into()))
}

#[builtin(name = "string.replace_all", category = "strings", returns = "string")]
fn string_replace_all(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 3 {
        return Err(EvalError::arity_error("string.replace_all", ARITY_THREE, args.len()));
    }
    let s = as_str(&args[0], "string.replace_all", 1)?;
    let re = as_regex(&args[1], "string.replace_all", 2)?;
    let replacement = as_str(&args[2], "string.replace_all", 3)?;
    Ok(Value::Str(re.replace_all(s, replacement).into_owned().into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_counts_chars_not_bytes() {
        assert!(matches!(string_length(&[Value::Str("héllo".into())]), Ok(Value::Long(5))));
    }

    #[test]
    fn substring_defaults_end_to_length() {
        let v = string_substring(&[Value::Str("hello".into()), Value::Long(2)]).unwrap();
        assert!(matches!(v, Value::Str(s) if &*s == "llo"));
    }

    #[test]
    fn substring_clamps_out_of_range_bounds() {
        let v = string_substring(&[Value::Str("hi".into()), Value::Long(0), Value::Long(99)]).unwrap();
        assert!(matches!(v, Value::Str(s) if &*s == "hi"));
    }

    #[test]
    fn index_of_returns_negative_one_when_absent() {
        assert!(matches!(string_index_of(&[Value::Str("abc".into()), Value::Str("z".into())]), Ok(Value::Long(-1))));
    }

    #[test]
    fn split_honors_limit() {
        let re = Value::Regex(Rc::new(regex::Regex::new(",").unwrap()));
        let v = string_split(&[Value::Str("a,b,c".into()), re, Value::Long(2)]).unwrap();
        match v {
            Value::List(l) => assert_eq!(l.borrow().len(), 2),
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn join_renders_elements_with_display() {
        let list = Value::List(Rc::new(std::cell::RefCell::new(vec![Value::Long(1), Value::Long(2)])));
        assert!(matches!(string_join(&[list, Value::Str("-".into())]), Ok(Value::Str(s)) if &*s == "1-2"));
    }
}
