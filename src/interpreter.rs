// ABOUTME: Tree-walking evaluator (§4.4): block/function scoping, flattened-name
// ABOUTME: call dispatch, assignment semantics, string interpolation, and iteration.

use crate::ast::{Expr, Stmt};
use crate::config::MAX_CALL_DEPTH;
use crate::env::Environment;
use crate::error::EvalError;
use crate::parser;
use crate::token::{Token, TokenKind};
use crate::value::{Closure, ClosureBody, MapKey, Value};
use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::{Num, ToPrimitive, Zero};
use regex::Regex;
use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

/// Tagged signal distinct from every ordinary value (§3), used to unwind
/// block execution for `break`/`continue`/`return`.
pub enum Flow {
    Break,
    Continue,
    Return(Value),
}

/// The outcome of executing a statement or statement list: either the value
/// it contributes to its enclosing block, or a control-flow signal that
/// must propagate past it.
enum ExecOutcome {
    Value(Value),
    Flow(Flow),
}

pub struct Interpreter {
    depth: RefCell<usize>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            depth: RefCell::new(0),
        }
    }

    /// Runs a statement list to completion, returning the script value (§3,
    /// §4.4): the value of the last statement that did not unwind, or nil.
    pub fn run(&self, stmts: &[Stmt], env: &Rc<Environment>) -> Result<Value, EvalError> {
        match self.exec_block(stmts, env)? {
            ExecOutcome::Value(v) => Ok(v),
            ExecOutcome::Flow(Flow::Return(v)) => Ok(v),
            ExecOutcome::Flow(_) => Ok(Value::Nil),
        }
    }

    fn exec_block(&self, stmts: &[Stmt], env: &Rc<Environment>) -> Result<ExecOutcome, EvalError> {
        let mut last = ExecOutcome::Value(Value::Nil);
        for stmt in stmts {
            last = self.exec_stmt(stmt, env)?;
            if matches!(last, ExecOutcome::Flow(_)) {
                return Ok(last);
            }
        }
        Ok(last)
    }

    fn exec_stmt(&self, stmt: &Stmt, env: &Rc<Environment>) -> Result<ExecOutcome, EvalError> {
        match stmt {
            Stmt::ExprStmt { expr, had_semicolon } => {
                let v = self.eval_expr(expr, env)?;
                Ok(ExecOutcome::Value(if *had_semicolon { Value::Nil } else { v }))
            }
            Stmt::Let { name, init, .. } => {
                let v = self.eval_expr(init, env)?;
                env.define(name.to_string(), v);
                Ok(ExecOutcome::Value(Value::Nil))
            }
            Stmt::If {
                cond,
                then_branch,
                elsifs,
                else_branch,
            } => {
                if self.eval_expr(cond, env)?.is_truthy() {
                    return self.exec_block(then_branch, &Environment::with_parent(env.clone()));
                }
                for clause in elsifs {
                    if self.eval_expr(&clause.cond, env)?.is_truthy() {
                        return self.exec_block(&clause.body, &Environment::with_parent(env.clone()));
                    }
                }
                if let Some(else_branch) = else_branch {
                    return self.exec_block(else_branch, &Environment::with_parent(env.clone()));
                }
                Ok(ExecOutcome::Value(Value::Nil))
            }
            Stmt::While { cond, body } => {
                loop {
                    if !self.eval_expr(cond, env)?.is_truthy() {
                        break;
                    }
                    let iter_env = Environment::with_parent(env.clone());
                    match self.exec_block(body, &iter_env)? {
                        ExecOutcome::Flow(Flow::Break) => break,
                        ExecOutcome::Flow(Flow::Continue) => continue,
                        ExecOutcome::Flow(Flow::Return(v)) => {
                            return Ok(ExecOutcome::Flow(Flow::Return(v)))
                        }
                        ExecOutcome::Value(_) => {}
                    }
                }
                Ok(ExecOutcome::Value(Value::Nil))
            }
            Stmt::For {
                index_name,
                item_name,
                iterable,
                body,
            } => self.exec_for(index_name, item_name, iterable, body, env),
            Stmt::Fn {
                name, params, body, ..
            } => {
                let closure = Rc::new(Closure {
                    params: params.clone(),
                    body: ClosureBody::Block(Rc::new(body.clone())),
                    env: env.clone(),
                    name: Some(name.clone()),
                });
                env.define(name.to_string(), Value::Closure(closure));
                Ok(ExecOutcome::Value(Value::Nil))
            }
            Stmt::Return { expr, .. } => {
                let v = match expr {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::Nil,
                };
                Ok(ExecOutcome::Flow(Flow::Return(v)))
            }
            Stmt::Break { .. } => Ok(ExecOutcome::Flow(Flow::Break)),
            Stmt::Continue { .. } => Ok(ExecOutcome::Flow(Flow::Continue)),
            Stmt::Block(stmts) => self.exec_block(stmts, &Environment::with_parent(env.clone())),
            Stmt::Try {
                try_block,
                catch_name,
                catch_block,
                finally_block,
            } => self.exec_try(try_block, catch_name, catch_block, finally_block, env),
            Stmt::Throw { expr, .. } => {
                let v = self.eval_expr(expr, env)?;
                Err(EvalError::Thrown(v))
            }
        }
    }

    fn exec_for(
        &self,
        index_name: &Option<Rc<str>>,
        item_name: &Rc<str>,
        iterable: &Expr,
        body: &[Stmt],
        env: &Rc<Environment>,
    ) -> Result<ExecOutcome, EvalError> {
        let iterable_val = self.eval_expr(iterable, env)?;

        macro_rules! drive_loop {
            ($bind:expr) => {{
                let iter_env = Environment::with_parent(env.clone());
                $bind(&iter_env);
                match self.exec_block(body, &iter_env)? {
                    ExecOutcome::Flow(Flow::Break) => return Ok(ExecOutcome::Value(Value::Nil)),
                    ExecOutcome::Flow(Flow::Continue) => continue,
                    ExecOutcome::Flow(Flow::Return(v)) => {
                        return Ok(ExecOutcome::Flow(Flow::Return(v)))
                    }
                    ExecOutcome::Value(_) => {}
                }
            }};
        }

        match iterable_val {
            Value::Map(m) => {
                let entries: Vec<(Value, Value)> =
                    m.borrow().iter().map(|(k, v)| (k.0.clone(), v.clone())).collect();
                for (k, v) in entries {
                    drive_loop!(|frame: &Rc<Environment>| {
                        match index_name {
                            Some(idx) => {
                                frame.define(idx.to_string(), k.clone());
                                frame.define(item_name.to_string(), v.clone());
                            }
                            None => {
                                let mut record = IndexMap::new();
                                record.insert(MapKey(Value::Str("key".into())), k.clone());
                                record.insert(MapKey(Value::Str("value".into())), v.clone());
                                frame.define(
                                    item_name.to_string(),
                                    Value::Map(Rc::new(RefCell::new(record))),
                                );
                            }
                        }
                    });
                }
            }
            Value::List(items) => {
                let elems: Vec<Value> = items.borrow().clone();
                for (i, elem) in elems.into_iter().enumerate() {
                    drive_loop!(|frame: &Rc<Environment>| {
                        if let Some(idx) = index_name {
                            frame.define(idx.to_string(), Value::Long(i as i64));
                        }
                        frame.define(item_name.to_string(), elem.clone());
                    });
                }
            }
            Value::Set(s) => {
                let elems: Vec<Value> = s.borrow().iter().map(|k| k.0.clone()).collect();
                for (i, elem) in elems.into_iter().enumerate() {
                    drive_loop!(|frame: &Rc<Environment>| {
                        if let Some(idx) = index_name {
                            frame.define(idx.to_string(), Value::Long(i as i64));
                        }
                        frame.define(item_name.to_string(), elem.clone());
                    });
                }
            }
            _ => return Err(EvalError::NotIterable),
        }

        Ok(ExecOutcome::Value(Value::Nil))
    }

    fn exec_try(
        &self,
        try_block: &[Stmt],
        catch_name: &Option<Rc<str>>,
        catch_block: &Option<Vec<Stmt>>,
        finally_block: &Option<Vec<Stmt>>,
        env: &Rc<Environment>,
    ) -> Result<ExecOutcome, EvalError> {
        let try_env = Environment::with_parent(env.clone());
        let outcome = match self.exec_block(try_block, &try_env) {
            Ok(o) => Ok(o),
            Err(e) => match catch_block {
                Some(catch_block) => {
                    let catch_env = Environment::with_parent(env.clone());
                    if let Some(name) = catch_name {
                        catch_env.define(name.to_string(), error_to_value(e));
                    }
                    self.exec_block(catch_block, &catch_env)
                }
                None => Err(e),
            },
        };

        if let Some(finally_block) = finally_block {
            let finally_env = Environment::with_parent(env.clone());
            if let ExecOutcome::Flow(flow) = self.exec_block(finally_block, &finally_env)? {
                return Ok(ExecOutcome::Flow(flow));
            }
        }

        outcome
    }

    pub fn eval_expr(&self, expr: &Expr, env: &Rc<Environment>) -> Result<Value, EvalError> {
        match expr {
            Expr::Leaf(tok) => self.eval_leaf(tok, env),
            Expr::Unary(op, operand) => self.eval_unary(op, operand, env),
            Expr::Binary(op, lhs, rhs) => self.eval_binary(op, lhs, rhs, env),
            Expr::Ternary(_, cond, cons, alt) => {
                if self.eval_expr(cond, env)?.is_truthy() {
                    self.eval_expr(cons, env)
                } else {
                    self.eval_expr(alt, env)
                }
            }
            Expr::Subscript(_, base, index) => self.eval_subscript(base, index, env),
            Expr::Call(callee, arg_exprs, _) => self.eval_call(callee, arg_exprs, env),
            Expr::Lambda(params, body, _) => {
                let closure = Closure {
                    params: params.clone(),
                    body: ClosureBody::Expr(Rc::new((**body).clone())),
                    env: env.clone(),
                    name: None,
                };
                Ok(Value::Closure(Rc::new(closure)))
            }
        }
    }

    fn eval_leaf(&self, tok: &Token, env: &Rc<Environment>) -> Result<Value, EvalError> {
        match tok.kind {
            TokenKind::Number => eval_number_literal(&tok.lexeme),
            TokenKind::Str => self.eval_string_literal(tok, env),
            TokenKind::Regex => eval_regex_literal(&tok.lexeme),
            TokenKind::True => Ok(Value::Boolean(true)),
            TokenKind::False => Ok(Value::Boolean(false)),
            TokenKind::Nil => Ok(Value::Nil),
            TokenKind::Ident => Ok(env.get(tok.lexeme.as_ref()).unwrap_or(Value::Undefined)),
            _ => unreachable!("parser only produces literal/identifier leaves"),
        }
    }

    fn eval_unary(&self, op: &Token, operand: &Expr, env: &Rc<Environment>) -> Result<Value, EvalError> {
        let v = self.eval_expr(operand, env)?;
        match op.kind {
            TokenKind::Minus => match v {
                Value::Long(n) => Ok(Value::Long(-n)),
                Value::Double(d) => Ok(Value::Double(-d)),
                Value::BigInt(b) => Ok(Value::BigInt(Rc::new(-b.as_ref().clone()))),
                other => Err(EvalError::type_error("-", "number", &other, 1)),
            },
            TokenKind::Bang => Ok(Value::Boolean(!v.is_truthy())),
            TokenKind::Tilde => {
                let n = to_i64_opt(&v).ok_or_else(|| EvalError::type_error("~", "long", &v, 1))?;
                Ok(Value::Long(!n))
            }
            _ => unreachable!("parser only produces - ! ~ as prefix operators"),
        }
    }

    fn eval_binary(
        &self,
        op: &Token,
        lhs: &Expr,
        rhs: &Expr,
        env: &Rc<Environment>,
    ) -> Result<Value, EvalError> {
        use TokenKind::*;
        match op.kind {
            Eq => {
                let value = self.eval_expr(rhs, env)?;
                self.assign_to(lhs, value.clone(), env)?;
                Ok(value)
            }
            Dot => {
                let base = self.eval_expr(lhs, env)?;
                let name = match rhs {
                    Expr::Leaf(t) if t.kind == TokenKind::Ident => t.lexeme.as_ref(),
                    _ => return Err(EvalError::runtime_error(".", "right of '.' must be an identifier")),
                };
                Ok(property_get(&base, name))
            }
            AndAnd => {
                let l = self.eval_expr(lhs, env)?;
                if !l.is_truthy() {
                    Ok(l)
                } else {
                    self.eval_expr(rhs, env)
                }
            }
            OrOr => {
                let l = self.eval_expr(lhs, env)?;
                if l.is_truthy() {
                    Ok(l)
                } else {
                    self.eval_expr(rhs, env)
                }
            }
            RegexMatch => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                match r {
                    Value::Regex(re) => Ok(Value::Boolean(full_match(&re, &l.to_string()))),
                    other => Err(EvalError::type_error("=~", "pattern", &other, 2)),
                }
            }
            EqEq => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                Ok(Value::Boolean(l.loose_eq(&r)))
            }
            NotEq => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                Ok(Value::Boolean(!l.loose_eq(&r)))
            }
            Lt | Le | Gt | Ge => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                let ord = compare_values(&l, &r)?;
                Ok(Value::Boolean(match op.kind {
                    Lt => ord.is_lt(),
                    Le => ord.is_le(),
                    Gt => ord.is_gt(),
                    Ge => ord.is_ge(),
                    _ => unreachable!(),
                }))
            }
            Shl | Shr | UShr | Amp | Pipe | Caret => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                int_binop(op.kind, &l, &r)
            }
            Plus => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) {
                    Ok(Value::Str(format!("{l}{r}").into()))
                } else {
                    numeric_binop(Plus, &l, &r)
                }
            }
            Minus | Star | Slash | Percent | StarStar => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                numeric_binop(op.kind, &l, &r)
            }
            _ => unreachable!("parser only produces known binary operator kinds"),
        }
    }

    fn eval_subscript(&self, base: &Expr, index: &Expr, env: &Rc<Environment>) -> Result<Value, EvalError> {
        let base_val = self.eval_expr(base, env)?;
        let index_val = self.eval_expr(index, env)?;
        match &base_val {
            Value::List(items) => Ok(as_index(&index_val)
                .and_then(|i| items.borrow().get(i).cloned())
                .unwrap_or(Value::Undefined)),
            Value::Map(m) => Ok(m.borrow().get(&MapKey(index_val)).cloned().unwrap_or(Value::Undefined)),
            Value::Str(s) => Ok(as_index(&index_val)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::Str(c.to_string().into()))
                .unwrap_or(Value::Undefined)),
            _ => Err(EvalError::runtime_error("[]", "value is not indexable")),
        }
    }

    fn eval_call(&self, callee: &Expr, arg_exprs: &[Expr], env: &Rc<Environment>) -> Result<Value, EvalError> {
        let callee_val = match fold_dotted_name(callee).and_then(|name| env.get(&name)) {
            Some(v) => v,
            None => self.eval_expr(callee, env)?,
        };
        let mut args = Vec::with_capacity(arg_exprs.len());
        for a in arg_exprs {
            args.push(self.eval_expr(a, env)?);
        }
        self.call_value(&callee_val, args)
    }

    /// Applies any callable `Value` to already-evaluated arguments. Used
    /// both for ordinary call expressions and by higher-order built-ins
    /// (`map`, `filter`, `reduce`, …) that need to invoke a callback.
    pub(crate) fn call_value(&self, callee: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
        match callee {
            Value::Native(f) => f(&args),
            Value::Closure(c) => self.call_closure(c, args),
            _ => Err(EvalError::NotCallable),
        }
    }

    fn call_closure(&self, c: &Rc<Closure>, args: Vec<Value>) -> Result<Value, EvalError> {
        {
            let mut d = self.depth.borrow_mut();
            *d += 1;
            if *d > MAX_CALL_DEPTH {
                *d -= 1;
                return Err(EvalError::runtime_error("call", "maximum call depth exceeded"));
            }
        }
        let _guard = DepthGuard { depth: &self.depth };

        let call_env = Environment::with_parent(c.env.clone());
        for (i, pname) in c.params.iter().enumerate() {
            call_env.define(pname.to_string(), args.get(i).cloned().unwrap_or(Value::Undefined));
        }
        match &c.body {
            ClosureBody::Expr(e) => self.eval_expr(e, &call_env),
            ClosureBody::Block(stmts) => match self.exec_block(stmts, &call_env)? {
                ExecOutcome::Value(v) => Ok(v),
                ExecOutcome::Flow(Flow::Return(v)) => Ok(v),
                ExecOutcome::Flow(_) => Ok(Value::Nil),
            },
        }
    }

    fn assign_to(&self, target: &Expr, value: Value, env: &Rc<Environment>) -> Result<(), EvalError> {
        match target {
            Expr::Leaf(tok) if tok.kind == TokenKind::Ident => {
                env.assign(tok.lexeme.as_ref(), value);
                Ok(())
            }
            Expr::Binary(dot_tok, base, field) if dot_tok.kind == TokenKind::Dot => {
                let base_val = self.eval_expr(base, env)?;
                let name = match field.as_ref() {
                    Expr::Leaf(t) if t.kind == TokenKind::Ident => t.lexeme.to_string(),
                    _ => return Err(EvalError::InvalidAssignmentTarget),
                };
                match base_val {
                    Value::Map(m) => {
                        m.borrow_mut().insert(MapKey(Value::Str(name.into())), value);
                        Ok(())
                    }
                    _ => Err(EvalError::InvalidAssignmentTarget),
                }
            }
            Expr::Subscript(_, base, index) => {
                let base_val = self.eval_expr(base, env)?;
                let index_val = self.eval_expr(index, env)?;
                match base_val {
                    Value::List(items) => {
                        let idx = as_index(&index_val).ok_or(EvalError::InvalidAssignmentTarget)?;
                        let mut items_mut = items.borrow_mut();
                        if idx < items_mut.len() {
                            items_mut[idx] = value;
                        } else if idx == items_mut.len() {
                            items_mut.push(value);
                        } else {
                            items_mut.resize(idx, Value::Undefined);
                            items_mut.push(value);
                        }
                        Ok(())
                    }
                    Value::Map(m) => {
                        m.borrow_mut().insert(MapKey(index_val), value);
                        Ok(())
                    }
                    _ => Err(EvalError::InvalidAssignmentTarget),
                }
            }
            _ => Err(EvalError::InvalidAssignmentTarget),
        }
    }

    fn eval_string_literal(&self, token: &Token, env: &Rc<Environment>) -> Result<Value, EvalError> {
        let raw = token.lexeme.as_ref();
        let quote = raw.chars().next().unwrap_or('"');
        let inner = &raw[1..raw.len().saturating_sub(1)];
        let unescaped = unescape_string(inner, quote);
        let interpolated = self.interpolate(&unescaped, env)?;
        Ok(Value::Str(interpolated.into()))
    }

    /// Replaces every `#{expr}` in `s` with the stringified result of
    /// re-parsing and evaluating `expr` (§4.4, §9). A placeholder whose
    /// contents fail to parse or evaluate is left exactly as written.
    fn interpolate(&self, s: &str, env: &Rc<Environment>) -> Result<String, EvalError> {
        let chars: Vec<char> = s.chars().collect();
        let mut out = String::new();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '#' && chars.get(i + 1) == Some(&'{') {
                if let Some(rel_end) = chars[i + 2..].iter().position(|&c| c == '}') {
                    let expr_src: String = chars[i + 2..i + 2 + rel_end].iter().collect();
                    let rendered = parser::parse_expr_str(&expr_src)
                        .ok()
                        .and_then(|e| self.eval_expr(&e, env).ok())
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| format!("#{{{expr_src}}}"));
                    out.push_str(&rendered);
                    i += 2 + rel_end + 1;
                    continue;
                }
            }
            out.push(chars[i]);
            i += 1;
        }
        Ok(out)
    }
}

/// Invokes a callback `Value` from a built-in function (`map`, `filter`,
/// `reduce`, `sort`, …), which only has the arguments it was called with,
/// not the interpreter that's driving the surrounding script. A fresh
/// `Interpreter` is enough: closures carry their own captured frame, and
/// the recursion-depth guard only needs to bound the callback's own call
/// tree, not the caller's.
pub(crate) fn call_callback(callee: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
    Interpreter::new().call_value(callee, args)
}

struct DepthGuard<'a> {
    depth: &'a RefCell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        *self.depth.borrow_mut() -= 1;
    }
}

fn error_to_value(e: EvalError) -> Value {
    match e {
        EvalError::Thrown(v) => v,
        other => Value::Str(other.to_string().into()),
    }
}

fn property_get(base: &Value, name: &str) -> Value {
    match base {
        Value::Map(m) => m
            .borrow()
            .get(&MapKey(Value::Str(name.into())))
            .cloned()
            .unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    }
}

/// Folds a chain of `.` nodes whose leaves are all identifiers into one
/// dotted name, e.g. `string.endsWith` → `"string.endsWith"` (§4.4's
/// flattened-name call lookup). Only ever applied to a `Call`'s callee.
///
/// Shared with the static analyzer (§4.6), which resolves the same dotted
/// chains against the built-in catalog's root symbol table.
pub(crate) fn fold_dotted_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Leaf(tok) if tok.kind == TokenKind::Ident => Some(tok.lexeme.to_string()),
        Expr::Binary(op, lhs, rhs) if op.kind == TokenKind::Dot => {
            let base = fold_dotted_name(lhs)?;
            match rhs.as_ref() {
                Expr::Leaf(tok) if tok.kind == TokenKind::Ident => Some(format!("{base}.{}", tok.lexeme)),
                _ => None,
            }
        }
        _ => None,
    }
}

fn as_index(v: &Value) -> Option<usize> {
    match v {
        Value::Long(n) if *n >= 0 => Some(*n as usize),
        Value::Double(d) if *d >= 0.0 && d.fract() == 0.0 => Some(*d as usize),
        _ => None,
    }
}

fn to_i64_opt(v: &Value) -> Option<i64> {
    match v {
        Value::Long(n) => Some(*n),
        Value::BigInt(b) => b.to_i64(),
        Value::Double(d) if d.fract() == 0.0 => Some(*d as i64),
        _ => None,
    }
}

fn to_f64_opt(v: &Value) -> Option<f64> {
    match v {
        Value::Long(n) => Some(*n as f64),
        Value::Double(d) => Some(*d),
        Value::BigInt(b) => b.to_f64(),
        _ => None,
    }
}

fn to_bigint_opt(v: &Value) -> Option<BigInt> {
    match v {
        Value::Long(n) => Some(BigInt::from(*n)),
        Value::BigInt(b) => Some((**b).clone()),
        _ => None,
    }
}

fn int_binop(kind: TokenKind, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    use TokenKind::*;
    let a = to_i64_opt(lhs).ok_or_else(|| EvalError::type_error("bitwise", "long", lhs, 1))?;
    let b = to_i64_opt(rhs).ok_or_else(|| EvalError::type_error("bitwise", "long", rhs, 2))?;
    Ok(Value::Long(match kind {
        Amp => a & b,
        Pipe => a | b,
        Caret => a ^ b,
        Shl => a << (b & 63),
        Shr => a >> (b & 63),
        UShr => ((a as u64) >> ((b & 63) as u32)) as i64,
        _ => unreachable!("caller only dispatches bitwise/shift operators"),
    }))
}

pub(crate) fn compare_values(lhs: &Value, rhs: &Value) -> Result<std::cmp::Ordering, EvalError> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => {
            let a = to_f64_opt(lhs).ok_or_else(|| EvalError::type_error("compare", "number", lhs, 1))?;
            let b = to_f64_opt(rhs).ok_or_else(|| EvalError::type_error("compare", "number", rhs, 2))?;
            a.partial_cmp(&b)
                .ok_or_else(|| EvalError::runtime_error("compare", "values are not ordered"))
        }
    }
}

fn numeric_binop(kind: TokenKind, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    if matches!(lhs, Value::Double(_)) || matches!(rhs, Value::Double(_)) {
        let a = to_f64_opt(lhs).ok_or_else(|| EvalError::type_error("arithmetic", "number", lhs, 1))?;
        let b = to_f64_opt(rhs).ok_or_else(|| EvalError::type_error("arithmetic", "number", rhs, 2))?;
        return Ok(Value::Double(apply_f64(kind, a, b)));
    }
    if matches!(lhs, Value::BigInt(_)) || matches!(rhs, Value::BigInt(_)) {
        let a = to_bigint_opt(lhs).ok_or_else(|| EvalError::type_error("arithmetic", "number", lhs, 1))?;
        let b = to_bigint_opt(rhs).ok_or_else(|| EvalError::type_error("arithmetic", "number", rhs, 2))?;
        return Ok(Value::BigInt(Rc::new(apply_bigint(kind, a, b)?)));
    }
    match (lhs, rhs) {
        (Value::Long(a), Value::Long(b)) => apply_long(kind, *a, *b),
        (Value::Long(_), other) => Err(EvalError::type_error("arithmetic", "number", other, 2)),
        (other, _) => Err(EvalError::type_error("arithmetic", "number", other, 1)),
    }
}

fn apply_long(kind: TokenKind, a: i64, b: i64) -> Result<Value, EvalError> {
    use TokenKind::*;
    Ok(match kind {
        Plus => a
            .checked_add(b)
            .map(Value::Long)
            .unwrap_or_else(|| Value::BigInt(Rc::new(BigInt::from(a) + BigInt::from(b)))),
        Minus => a
            .checked_sub(b)
            .map(Value::Long)
            .unwrap_or_else(|| Value::BigInt(Rc::new(BigInt::from(a) - BigInt::from(b)))),
        Star => a
            .checked_mul(b)
            .map(Value::Long)
            .unwrap_or_else(|| Value::BigInt(Rc::new(BigInt::from(a) * BigInt::from(b)))),
        Slash => {
            if b == 0 {
                return Err(EvalError::runtime_error("/", "division by zero"));
            }
            Value::Long(a / b)
        }
        Percent => {
            if b == 0 {
                return Err(EvalError::runtime_error("%", "division by zero"));
            }
            Value::Long(a % b)
        }
        StarStar => Value::Double((a as f64).powf(b as f64)),
        _ => unreachable!("apply_long only called for arithmetic operators"),
    })
}

fn apply_f64(kind: TokenKind, a: f64, b: f64) -> f64 {
    use TokenKind::*;
    match kind {
        Plus => a + b,
        Minus => a - b,
        Star => a * b,
        Slash => a / b,
        Percent => a % b,
        StarStar => a.powf(b),
        _ => unreachable!("apply_f64 only called for arithmetic operators"),
    }
}

fn apply_bigint(kind: TokenKind, a: BigInt, b: BigInt) -> Result<BigInt, EvalError> {
    use TokenKind::*;
    Ok(match kind {
        Plus => a + b,
        Minus => a - b,
        Star => a * b,
        Slash => {
            if b.is_zero() {
                return Err(EvalError::runtime_error("/", "division by zero"));
            }
            a / b
        }
        Percent => {
            if b.is_zero() {
                return Err(EvalError::runtime_error("%", "division by zero"));
            }
            a % b
        }
        StarStar => return Err(EvalError::runtime_error("**", "exponent is not supported for bigint")),
        _ => unreachable!("apply_bigint only called for arithmetic operators"),
    })
}

fn full_match(re: &Regex, s: &str) -> bool {
    match re.find(s) {
        Some(m) => m.start() == 0 && m.end() == s.len(),
        None => false,
    }
}

fn unescape_string(s: &str, _quote: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn eval_number_literal(lexeme: &str) -> Result<Value, EvalError> {
    let (body, suffix) = match lexeme.chars().last() {
        Some('N') => (&lexeme[..lexeme.len() - 1], Some('N')),
        Some('M') => (&lexeme[..lexeme.len() - 1], Some('M')),
        _ => (lexeme, None),
    };

    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        return match suffix {
            Some('N') => BigInt::from_str_radix(hex, 16)
                .map(|b| Value::BigInt(Rc::new(b)))
                .map_err(|e| EvalError::runtime_error("number", e.to_string())),
            _ => i64::from_str_radix(hex, 16)
                .map(Value::Long)
                .map_err(|e| EvalError::runtime_error("number", e.to_string())),
        };
    }

    match suffix {
        Some('N') => BigInt::from_str(body)
            .map(|b| Value::BigInt(Rc::new(b)))
            .map_err(|_| EvalError::runtime_error("number", "invalid integer literal")),
        Some('M') => body
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| EvalError::runtime_error("number", "invalid decimal literal")),
        _ => {
            if body.contains('.') || body.contains('e') || body.contains('E') {
                body.parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| EvalError::runtime_error("number", "invalid number literal"))
            } else {
                match body.parse::<i64>() {
                    Ok(n) => Ok(Value::Long(n)),
                    Err(_) => BigInt::from_str(body)
                        .map(|b| Value::BigInt(Rc::new(b)))
                        .map_err(|_| EvalError::runtime_error("number", "invalid integer literal")),
                }
            }
        }
    }
}

fn eval_regex_literal(lexeme: &str) -> Result<Value, EvalError> {
    let inner = &lexeme[1..lexeme.len().saturating_sub(1)];
    let pattern = inner.replace("\\/", "/");
    Regex::new(&pattern)
        .map(|re| Value::Regex(Rc::new(re)))
        .map_err(|e| EvalError::runtime_error("regex", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_script(src: &str) -> Value {
        let stmts = parser::parse_script(src).unwrap();
        let env = Environment::new();
        Interpreter::new().run(&stmts, &env).unwrap()
    }

    #[test]
    fn if_else_scenario() {
        let v = run_script(r#"let a = 10; if (a > 5) { "greater" } else { "lte" }"#);
        assert!(matches!(v, Value::Str(s) if &*s == "greater"));
    }

    #[test]
    fn recursive_fibonacci_scenario() {
        let v = run_script(
            "fn fib(n) { if (n <= 1) { return n; } return fib(n-1) + fib(n-2); } fib(10)",
        );
        assert!(matches!(v, Value::Long(55)));
    }

    #[test]
    fn string_interpolation_scenario() {
        let v = run_script(r#"let name = "World"; "Hello, #{name}! #{1+2}""#);
        assert!(matches!(v, Value::Str(s) if &*s == "Hello, World! 3"));
    }

    #[test]
    fn closure_over_mutable_binding_scenario() {
        let v = run_script(
            "fn counter() { let c = 0; return lambda() -> c = c + 1 end; } let f = counter(); f(); f(); f()",
        );
        assert!(matches!(v, Value::Long(3)));
    }

    #[test]
    fn semicolon_terminated_expr_stmt_yields_nil() {
        assert!(matches!(run_script("5;"), Value::Nil));
        assert!(matches!(run_script("5"), Value::Long(5)));
    }

    #[test]
    fn while_loop_with_break_and_continue() {
        let v = run_script(
            "let i = 0; let sum = 0; while (i < 10) { i = i + 1; if (i == 5) { continue; } if (i > 8) { break; } sum = sum + i; } sum",
        );
        // 1+2+3+4+6+7+8 = 31
        assert!(matches!(v, Value::Long(31)));
    }

    #[test]
    fn assignment_to_unbound_name_creates_global() {
        let v = run_script("x = 42; x");
        assert!(matches!(v, Value::Long(42)));
    }

    #[test]
    fn try_catch_finally_runs_on_every_path() {
        let v = run_script(
            r#"let log = ""; try { throw "boom"; } catch (e) { log = log + "caught:" + e; } finally { log = log + ":done"; } log"#,
        );
        assert!(matches!(v, Value::Str(s) if &*s == "caught:boom:done"));
    }

    #[test]
    fn dot_access_reads_map_field() {
        let env = Environment::new();
        let mut map = IndexMap::new();
        map.insert(MapKey(Value::Str("name".into())), Value::Str("Ada".into()));
        env.define("m".to_string(), Value::Map(Rc::new(RefCell::new(map))));
        let stmts = parser::parse_script("m.name").unwrap();
        let result = Interpreter::new().run(&stmts, &env).unwrap();
        assert!(matches!(result, Value::Str(s) if &*s == "Ada"));
    }

    #[test]
    fn undefined_identifier_reads_as_undefined() {
        assert!(matches!(run_script("missing"), Value::Undefined));
    }

    #[test]
    fn integer_overflow_promotes_to_bigint() {
        let v = run_script("9223372036854775807 + 1");
        assert!(matches!(v, Value::BigInt(_)));
    }

    #[test]
    fn for_index_equals_completed_iteration_count() {
        let env = Environment::new();
        env.define(
            "xs".to_string(),
            Value::List(Rc::new(RefCell::new(vec![
                Value::Str("a".into()),
                Value::Str("b".into()),
                Value::Str("c".into()),
            ]))),
        );
        let stmts =
            parser::parse_script("let last = -1; for i, x in xs { last = i; } last").unwrap();
        let result = Interpreter::new().run(&stmts, &env).unwrap();
        assert!(matches!(result, Value::Long(2)));
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let stmts = parser::parse_script("1 / 0").unwrap();
        let env = Environment::new();
        assert!(Interpreter::new().run(&stmts, &env).is_err());
    }
}
