// ABOUTME: The runtime value model, closures, and the two equality notions
// ABOUTME: scripts need: loose (coercing) `==` versus structural container-key identity.

use crate::ast::{Expr, Stmt};
use crate::env::Environment;
use crate::error::EvalError;
use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;
use regex::Regex;
use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Signature every catalog entry and every `aviator-macros`-generated
/// `register_<fn>` binds under.
pub type NativeFn = fn(&[Value]) -> Result<Value, EvalError>;

#[derive(Debug, Clone)]
pub enum ClosureBody {
    /// `lambda (x) -> x + 1 end`
    Expr(Rc<Expr>),
    /// `fn name(x) ... end`
    Block(Rc<Vec<Stmt>>),
}

/// A user-defined function value. Captures the defining frame by reference,
/// which is what makes closures over outer locals possible.
#[derive(Debug)]
pub struct Closure {
    pub params: Vec<Rc<str>>,
    pub body: ClosureBody,
    pub env: Rc<Environment>,
    pub name: Option<Rc<str>>,
}

#[derive(Debug, Clone)]
pub enum Value {
    Long(i64),
    Double(f64),
    Boolean(bool),
    Str(Rc<str>),
    BigInt(Rc<BigInt>),
    Nil,
    /// Result of looking up a name with no binding anywhere in scope.
    Undefined,
    Regex(Rc<Regex>),
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<IndexMap<MapKey, Value>>>),
    Set(Rc<RefCell<IndexSet<MapKey>>>),
    Closure(Rc<Closure>),
    Native(NativeFn),
}

/// Wraps a [`Value`] for use as a `Map`/`Set` key, using structural rather
/// than loose equality: `1 == 1.0` at script level, but they must not
/// collapse to one map key.
#[derive(Debug, Clone)]
pub struct MapKey(pub Value);

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.struct_eq(&other.0)
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.struct_hash(state);
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::Str(_) => "string",
            Value::BigInt(_) => "bigint",
            Value::Nil => "nil",
            Value::Undefined => "undefined",
            Value::Regex(_) => "pattern",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Closure(_) | Value::Native(_) => "function",
        }
    }

    /// Only `false`, `nil`, and `undefined` are falsy; every other value,
    /// including `0` and `""`, is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Nil | Value::Undefined)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Native(_))
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Long(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            Value::BigInt(b) => num_traits::ToPrimitive::to_f64(b.as_ref()),
            _ => None,
        }
    }

    /// Script-level `==`/`!=`: numeric types compare across representation,
    /// everything else compares by kind and then by value/identity.
    pub fn loose_eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Nil, Nil) | (Undefined, Undefined) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Regex(a), Regex(b)) => a.as_str() == b.as_str(),
            (List(a), List(b)) => Rc::ptr_eq(a, b),
            (Map(a), Map(b)) => Rc::ptr_eq(a, b),
            (Set(a), Set(b)) => Rc::ptr_eq(a, b),
            (Closure(a), Closure(b)) => Rc::ptr_eq(a, b),
            (Native(a), Native(b)) => *a as usize == *b as usize,
            (a, b) => match (a.numeric(), b.numeric()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Structural equality used for `Map`/`Set` key identity. Unlike
    /// `loose_eq`, this never coerces across numeric representations.
    pub fn struct_eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Long(a), Long(b)) => a == b,
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Boolean(a), Boolean(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (BigInt(a), BigInt(b)) => a == b,
            (Nil, Nil) | (Undefined, Undefined) => true,
            (Regex(a), Regex(b)) => a.as_str() == b.as_str(),
            (List(a), List(b)) => Rc::ptr_eq(a, b),
            (Map(a), Map(b)) => Rc::ptr_eq(a, b),
            (Set(a), Set(b)) => Rc::ptr_eq(a, b),
            (Closure(a), Closure(b)) => Rc::ptr_eq(a, b),
            (Native(a), Native(b)) => *a as usize == *b as usize,
            _ => false,
        }
    }

    fn struct_hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Long(n) => n.hash(state),
            Value::Double(n) => n.to_bits().hash(state),
            Value::Boolean(b) => b.hash(state),
            Value::Str(s) => s.hash(state),
            Value::BigInt(b) => b.hash(state),
            Value::Nil | Value::Undefined => {}
            Value::Regex(r) => r.as_str().hash(state),
            Value::List(l) => (Rc::as_ptr(l) as usize).hash(state),
            Value::Map(m) => (Rc::as_ptr(m) as usize).hash(state),
            Value::Set(s) => (Rc::as_ptr(s) as usize).hash(state),
            Value::Closure(c) => (Rc::as_ptr(c) as usize).hash(state),
            Value::Native(f) => (*f as usize).hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Long(n) => write!(f, "{n}"),
            Value::Double(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::BigInt(b) => write!(f, "{b}"),
            Value::Nil => write!(f, "nil"),
            Value::Undefined => write!(f, "undefined"),
            Value::Regex(r) => write!(f, "{}", r.as_str()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k.0, v)?;
                }
                write!(f, "}}")
            }
            Value::Set(s) => {
                write!(f, "#{{")?;
                for (i, v) in s.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v.0)?;
                }
                write!(f, "}}")
            }
            Value::Closure(c) => match &c.name {
                Some(name) => write!(f, "<function {name}>"),
                None => write!(f, "<function>"),
            },
            Value::Native(_) => write!(f, "<native function>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_eq_coerces_across_numeric_kinds() {
        assert!(Value::Long(1).loose_eq(&Value::Double(1.0)));
        assert!(!Value::Long(1).loose_eq(&Value::Str("1".into())));
    }

    #[test]
    fn struct_eq_does_not_coerce_across_numeric_kinds() {
        assert!(!Value::Long(1).struct_eq(&Value::Double(1.0)));
        assert!(Value::Long(1).struct_eq(&Value::Long(1)));
    }

    #[test]
    fn falsy_values() {
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Undefined.is_truthy());
        assert!(Value::Long(0).is_truthy());
        assert!(Value::Str("".into()).is_truthy());
    }

    #[test]
    fn map_key_distinguishes_long_and_double() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(MapKey(Value::Long(1)));
        set.insert(MapKey(Value::Double(1.0)));
        assert_eq!(set.len(), 2);
    }
}
