// ABOUTME: Collection built-ins (§6): range/tuple/min/max/count/is_empty,
// ABOUTME: the seq.* constructors/accessors, the higher-order combinators
// ABOUTME: (map/filter/reduce/include/sort/reverse), and seq.* predicate factories.

use crate::error::{EvalError, ARITY_ONE, ARITY_ONE_OR_TWO, ARITY_TWO, ARITY_TWO_OR_THREE};
use crate::interpreter::{call_callback, compare_values};
use crate::value::{MapKey, Value};
use aviator_macros::builtin;
use indexmap::{IndexMap, IndexSet};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

fn as_long(v: &Value, fname: &str, pos: usize) -> Result<i64, EvalError> {
    match v {
        Value::Long(n) => Ok(*n),
        Value::Double(d) if d.fract() == 0.0 => Ok(*d as i64),
        other => Err(EvalError::type_error(fname, "long", other, pos)),
    }
}

/// Any value the built-ins accept as a homogeneous sequence of elements to
/// walk: lists in insertion order, sets in insertion order, map entries as
/// `[key, value]` pairs.
fn as_elements(v: &Value, fname: &str, pos: usize) -> Result<Vec<Value>, EvalError> {
    match v {
        Value::List(l) => Ok(l.borrow().clone()),
        Value::Set(s) => Ok(s.borrow().iter().map(|k| k.0.clone()).collect()),
        Value::Map(m) => Ok(m
            .borrow()
            .iter()
            .map(|(k, v)| Value::List(Rc::new(RefCell::new(vec![k.0.clone(), v.clone()]))))
            .collect()),
        other => Err(EvalError::type_error(fname, "list, set or map", other, pos)),
    }
}

#[builtin(name = "range", category = "collections", returns = "list")]
fn range(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(EvalError::arity_error("range", ARITY_TWO_OR_THREE, args.len()));
    }
    let start = as_long(&args[0], "range", 1)?;
    let end = as_long(&args[1], "range", 2)?;
    let step = if args.len() == 3 { as_long(&args[2], "range", 3)? } else { 1 };
    if step == 0 {
        return Err(EvalError::runtime_error("range", "step must not be zero"));
    }
    let mut out = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < end {
            out.push(Value::Long(i));
            i += step;
        }
    } else {
        while i > end {
            out.push(Value::Long(i));
            i += step;
        }
    }
    Ok(Value::List(Rc::new(RefCell::new(out))))
}

#[builtin(name = "tuple", category = "collections", returns = "list")]
fn tuple(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::List(Rc::new(RefCell::new(args.to_vec()))))
}

#[builtin(name = "min", category = "collections", returns = "any")]
fn min(args: &[Value]) -> Result<Value, EvalError> {
    let items = if args.len() == 1 {
        as_elements(&args[0], "min", 1)?
    } else {
        args.to_vec()
    };
    items
        .into_iter()
        .try_fold(None::<Value>, |best, cur| match best {
            None => Ok(Some(cur)),
            Some(b) => Ok(Some(if compare_values(&cur, &b)? == Ordering::Less { cur } else { b })),
        })?
        .ok_or_else(|| EvalError::runtime_error("min", "empty sequence has no minimum"))
}

#[builtin(name = "max", category = "collections", returns = "any")]
fn max(args: &[Value]) -> Result<Value, EvalError> {
    let items = if args.len() == 1 {
        as_elements(&args[0], "max", 1)?
    } else {
        args.to_vec()
    };
    items
        .into_iter()
        .try_fold(None::<Value>, |best, cur| match best {
            None => Ok(Some(cur)),
            Some(b) => Ok(Some(if compare_values(&cur, &b)? == Ordering::Greater { cur } else { b })),
        })?
        .ok_or_else(|| EvalError::runtime_error("max", "empty sequence has no maximum"))
}

#[builtin(name = "count", category = "collections", returns = "long")]
fn count(args: &[Value]) -> Result<Value, EvalError> {
    let v = args.first().ok_or_else(|| EvalError::arity_error("count", ARITY_ONE, args.len()))?;
    let n = match v {
        Value::List(l) => l.borrow().len(),
        Value::Set(s) => s.borrow().len(),
        Value::Map(m) => m.borrow().len(),
        Value::Str(s) => s.chars().count(),
        other => return Err(EvalError::type_error("count", "list, set, map or string", other, 1)),
    };
    Ok(Value::Long(n as i64))
}

#[builtin(name = "is_empty", category = "collections", returns = "boolean")]
fn is_empty(args: &[Value]) -> Result<Value, EvalError> {
    let v = args.first().ok_or_else(|| EvalError::arity_error("is_empty", ARITY_ONE, args.len()))?;
    let empty = match v {
        Value::List(l) => l.borrow().is_empty(),
        Value::Set(s) => s.borrow().is_empty(),
        Value::Map(m) => m.borrow().is_empty(),
        Value::Str(s) => s.is_empty(),
        other => return Err(EvalError::type_error("is_empty", "list, set, map or string", other, 1)),
    };
    Ok(Value::Boolean(empty))
}

#[builtin(name = "seq.list", category = "collections", returns = "list")]
fn seq_list(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::List(Rc::new(RefCell::new(args.to_vec()))))
}

#[builtin(name = "seq.set", category = "collections", returns = "set")]
fn seq_set(args: &[Value]) -> Result<Value, EvalError> {
    let mut set = IndexSet::new();
    for v in args {
        set.insert(MapKey(v.clone()));
    }
    Ok(Value::Set(Rc::new(RefCell::new(set))))
}

#[builtin(name = "seq.map", category = "collections", returns = "map")]
fn seq_map(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() % 2 != 0 {
        return Err(EvalError::runtime_error("seq.map", "expects key, value pairs"));
    }
    let mut map = IndexMap::new();
    for pair in args.chunks(2) {
        map.insert(MapKey(pair[0].clone()), pair[1].clone());
    }
    Ok(Value::Map(Rc::new(RefCell::new(map))))
}

#[builtin(name = "seq.add", category = "collections", returns = "any")]
fn seq_add(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("seq.add", ARITY_TWO, args.len()));
    }
    match &args[0] {
        Value::List(l) => {
            l.borrow_mut().push(args[1].clone());
            Ok(args[0].clone())
        }
        Value::Set(s) => {
            s.borrow_mut().insert(MapKey(args[1].clone()));
            Ok(args[0].clone())
        }
        other => Err(EvalError::type_error("seq.add", "list or set", other, 1)),
    }
}

#[builtin(name = "seq.get", category = "collections", returns = "any")]
fn seq_get(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("seq.get", ARITY_TWO, args.len()));
    }
    match &args[0] {
        Value::List(l) => {
            let idx = as_long(&args[1], "seq.get", 2)?;
            let list = l.borrow();
            if idx < 0 || idx as usize >= list.len() {
                Ok(Value::Nil)
            } else {
                Ok(list[idx as usize].clone())
            }
        }
        Value::Map(m) => Ok(m.borrow().get(&MapKey(args[1].clone())).cloned().unwrap_or(Value::Nil)),
        other => Err(EvalError::type_error("seq.get", "list or map", other, 1)),
    }
}

#[builtin(name = "seq.contains_key", category = "collections", returns = "boolean")]
fn seq_contains_key(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("seq.contains_key", ARITY_TWO, args.len()));
    }
    match &args[0] {
        Value::Map(m) => Ok(Value::Boolean(m.borrow().contains_key(&MapKey(args[1].clone())))),
        Value::Set(s) => Ok(Value::Boolean(s.borrow().contains(&MapKey(args[1].clone())))),
        other => Err(EvalError::type_error("seq.contains_key", "map or set", other, 1)),
    }
}

#[builtin(name = "seq.remove", category = "collections", returns = "any")]
fn seq_remove(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("seq.remove", ARITY_TWO, args.len()));
    }
    match &args[0] {
        Value::Map(m) => Ok(m.borrow_mut().shift_remove(&MapKey(args[1].clone())).unwrap_or(Value::Nil)),
        Value::Set(s) => Ok(Value::Boolean(s.borrow_mut().shift_remove(&MapKey(args[1].clone())))),
        Value::List(l) => {
            let idx = as_long(&args[1], "seq.remove", 2)?;
            let mut list = l.borrow_mut();
            if idx < 0 || idx as usize >= list.len() {
                Ok(Value::Nil)
            } else {
                Ok(list.remove(idx as usize))
            }
        }
        other => Err(EvalError::type_error("seq.remove", "list, map or set", other, 1)),
    }
}

#[builtin(name = "map", category = "collections", returns = "list")]
fn map_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("map", ARITY_TWO, args.len()));
    }
    let items = as_elements(&args[0], "map", 1)?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(call_callback(&args[1], vec![item])?);
    }
    Ok(Value::List(Rc::new(RefCell::new(out))))
}

#[builtin(name = "filter", category = "collections", returns = "list")]
fn filter_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("filter", ARITY_TWO, args.len()));
    }
    let items = as_elements(&args[0], "filter", 1)?;
    let mut out = Vec::new();
    for item in items {
        if call_callback(&args[1], vec![item.clone()])?.is_truthy() {
            out.push(item);
        }
    }
    Ok(Value::List(Rc::new(RefCell::new(out))))
}

#[builtin(name = "reduce", category = "collections", returns = "any")]
fn reduce_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 3 {
        return Err(EvalError::arity_error("reduce", "3", args.len()));
    }
    let items = as_elements(&args[0], "reduce", 1)?;
    let mut acc = args[1].clone();
    for item in items {
        acc = call_callback(&args[2], vec![acc, item])?;
    }
    Ok(acc)
}

#[builtin(name = "include", category = "collections", returns = "boolean")]
fn include_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity_error("include", ARITY_TWO, args.len()));
    }
    let items = as_elements(&args[0], "include", 1)?;
    for item in items {
        if call_callback(&args[1], vec![item])?.is_truthy() {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

#[builtin(name = "sort", category = "collections", returns = "list")]
fn sort_fn(args: &[Value]) -> Result<Value, EvalError> {
    if args.is_empty() || args.len() > 2 {
        return Err(EvalError::arity_error("sort", ARITY_ONE_OR_TWO, args.len()));
    }
    let mut items = as_elements(&args[0], "sort", 1)?;
    if args.len() == 2 {
        let mut err = None;
        items.sort_by(|a, b| {
            if err.is_some() {
                return Ordering::Equal;
            }
            match call_callback(&args[1], vec![a.clone(), b.clone()]) {
                Ok(v) => as_long(&v, "sort", 2).unwrap_or(0).cmp(&0),
                Err(e) => {
                    err = Some(e);
                    Ordering::Equal
                }
            }
        });
        if let Some(e) = err {
            return Err(e);
        }
    } else {
        let mut err = None;
        items.sort_by(|a, b| match compare_values(a, b) {
            Ok(o) => o,
            Err(e) => {
                err = Some(e);
                Ordering::Equal
            }
        });
        if let Some(e) = err {
            return Err(e);
        }
    }
    Ok(Value::List(Rc::new(RefCell::new(items))))
}

#[builtin(name = "reverse", category = "collections", returns = "list")]
fn reverse_fn(args: &[Value]) -> Result<Value, EvalError> {
    let mut items = as_elements(args.first().ok_or_else(|| EvalError::arity_error("reverse", ARITY_ONE, args.len()))?, "reverse", 1)?;
    items.reverse();
    Ok(Value::List(Rc::new(RefCell::new(items))))
}

/// Builds the one-parameter closure a `seq.*` predicate factory returns.
/// `NativeFn` is a bare `fn` pointer with no capture slot, so the bound
/// comparison value can't live inside one directly; instead this wraps a
/// hidden native comparator (one per predicate kind, fixed at compile time)
/// in a real lexical closure exactly the way a user `lambda` captures its
/// defining frame, binding `bound` into that frame under a private name.
fn make_predicate_closure(bound: Value, cmp: crate::value::NativeFn) -> Value {
    use crate::ast::Expr;
    use crate::env::Environment;
    use crate::token::{Token, TokenKind};
    use crate::value::{Closure, ClosureBody};

    let env = Environment::with_parent(Environment::new());
    env.define("__seq_bound".to_string(), bound);
    env.define("__seq_cmp".to_string(), Value::Native(cmp));
    let ident = |name: &str| Expr::Leaf(Token::new(TokenKind::Ident, name, 0, 0, 0));
    let call = Expr::Call(
        Box::new(ident("__seq_cmp")),
        vec![ident("__seq_bound"), ident("__seq_x")],
        Token::new(TokenKind::LParen, "(", 0, 0, 0),
    );
    Value::Closure(Rc::new(Closure {
        params: vec![Rc::from("__seq_x")],
        body: ClosureBody::Expr(Rc::new(call)),
        env,
        name: None,
    }))
}

fn cmp_eq(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Boolean(args[0].loose_eq(&args[1])))
}
fn cmp_neq(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Boolean(!args[0].loose_eq(&args[1])))
}
fn cmp_gt(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Boolean(compare_values(&args[1], &args[0])? == Ordering::Greater))
}
fn cmp_ge(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Boolean(compare_values(&args[1], &args[0])? != Ordering::Less))
}
fn cmp_lt(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Boolean(compare_values(&args[1], &args[0])? == Ordering::Less))
}
fn cmp_le(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Boolean(compare_values(&args[1], &args[0])? != Ordering::Greater))
}

fn single_arg(args: &[Value], fname: &str) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity_error(fname, ARITY_ONE, args.len()));
    }
    Ok(args[0].clone())
}

#[builtin(name = "seq.eq", category = "collections", returns = "function")]
fn seq_eq(args: &[Value]) -> Result<Value, EvalError> {
    Ok(make_predicate_closure(single_arg(args, "seq.eq")?, cmp_eq))
}

#[builtin(name = "seq.neq", category = "collections", returns = "function")]
fn seq_neq(args: &[Value]) -> Result<Value, EvalError> {
    Ok(make_predicate_closure(single_arg(args, "seq.neq")?, cmp_neq))
}

#[builtin(name = "seq.gt", category = "collections", returns = "function")]
fn seq_gt(args: &[Value]) -> Result<Value, EvalError> {
    Ok(make_predicate_closure(single_arg(args, "seq.gt")?, cmp_gt))
}

#[builtin(name = "seq.ge", category = "collections", returns = "function")]
fn seq_ge(args: &[Value]) -> Result<Value, EvalError> {
    Ok(make_predicate_closure(single_arg(args, "seq.ge")?, cmp_ge))
}

#[builtin(name = "seq.lt", category = "collections", returns = "function")]
fn seq_lt(args: &[Value]) -> Result<Value, EvalError> {
    Ok(make_predicate_closure(single_arg(args, "seq.lt")?, cmp_lt))
}

#[builtin(name = "seq.le", category = "collections", returns = "function")]
fn seq_le(args: &[Value]) -> Result<Value, EvalError> {
    Ok(make_predicate_closure(single_arg(args, "seq.le")?, cmp_le))
}

#[builtin(name = "seq.nil", category = "collections", returns = "function")]
fn seq_nil(args: &[Value]) -> Result<Value, EvalError> {
    if !args.is_empty() {
        return Err(EvalError::arity_error("seq.nil", "0", args.len()));
    }
    fn is_nil(args: &[Value]) -> Result<Value, EvalError> {
        Ok(Value::Boolean(matches!(args.get(1), Some(Value::Nil) | Some(Value::Undefined))))
    }
    Ok(make_predicate_closure(Value::Nil, is_nil))
}

#[builtin(name = "seq.exists", category = "collections", returns = "function")]
fn seq_exists(args: &[Value]) -> Result<Value, EvalError> {
    if !args.is_empty() {
        return Err(EvalError::arity_error("seq.exists", "0", args.len()));
    }
    fn exists(args: &[Value]) -> Result<Value, EvalError> {
        Ok(Value::Boolean(!matches!(args.get(1), Some(Value::Nil) | Some(Value::Undefined) | None)))
    }
    Ok(make_predicate_closure(Value::Nil, exists))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::call_callback;

    #[test]
    fn range_generates_half_open_sequence() {
        let v = range(&[Value::Long(0), Value::Long(5)]).unwrap();
        match v {
            Value::List(l) => assert_eq!(l.borrow().len(), 5),
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn range_supports_negative_step() {
        let v = range(&[Value::Long(5), Value::Long(0), Value::Long(-1)]).unwrap();
        match v {
            Value::List(l) => assert_eq!(l.borrow().len(), 5),
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn min_and_max_over_a_list() {
        let list = Value::List(Rc::new(RefCell::new(vec![Value::Long(3), Value::Long(1), Value::Long(2)])));
        assert!(matches!(min(&[list.clone()]), Ok(Value::Long(1))));
        assert!(matches!(max(&[list]), Ok(Value::Long(3))));
    }

    #[test]
    fn seq_add_mutates_list_in_place() {
        let list = Value::List(Rc::new(RefCell::new(vec![Value::Long(1)])));
        seq_add(&[list.clone(), Value::Long(2)]).unwrap();
        match &list {
            Value::List(l) => assert_eq!(l.borrow().len(), 2),
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn seq_eq_predicate_is_callable_with_one_argument() {
        let pred = seq_eq(&[Value::Long(3)]).unwrap();
        assert!(matches!(call_callback(&pred, vec![Value::Long(3)]), Ok(Value::Boolean(true))));
        assert!(matches!(call_callback(&pred, vec![Value::Long(4)]), Ok(Value::Boolean(false))));
    }

    #[test]
    fn reverse_does_not_mutate_the_source_list() {
        let list = Value::List(Rc::new(RefCell::new(vec![Value::Long(1), Value::Long(2)])));
        let reversed = reverse_fn(&[list.clone()]).unwrap();
        match reversed {
            Value::List(l) => {
                let items = l.borrow();
                assert!(matches!(items[0], Value::Long(2)));
                assert!(matches!(items[1], Value::Long(1)));
            }
            _ => panic!("expected list"),
        }
        match &list {
            Value::List(l) => assert_eq!(l.borrow().len(), 2),
            _ => panic!("expected list"),
        }
    }
}
