// ABOUTME: Pending-execution engine (§4.5): factors `&&`/`||`/`!`/`?:` into
// ABOUTME: combinator nodes over opaque value leaves, lets a host provide free
// ABOUTME: identifiers incrementally, and memoizes every node once it executes.

use crate::ast::Expr;
use crate::error::{EvalError, ParseError};
use crate::interpreter::fold_dotted_name;
use crate::parser;
use crate::token::TokenKind;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

/// The host evaluator a `ValueExec` leaf defers to: re-parses its source
/// text and evaluates it against the bindings collected so far. This
/// crate's own interpreter is one implementation; a host embedding the
/// engine may supply another.
pub trait Runtime {
    fn run(&self, expression_text: &str, context: &HashMap<String, Value>) -> Result<Value, EvalError>;
    fn builtin_identifiers(&self) -> &[&str];
}

struct ValueExecData {
    source: String,
    free_identifiers: Vec<String>,
}

enum NodeKind {
    Value(ValueExecData),
    And(Box<PendingNode>, Box<PendingNode>),
    Or(Box<PendingNode>, Box<PendingNode>),
    Not(Box<PendingNode>),
    Cond(Box<PendingNode>, Box<PendingNode>, Box<PendingNode>),
}

struct PendingNode {
    kind: NodeKind,
    cache: RefCell<Option<Value>>,
}

impl PendingNode {
    fn leaf(data: ValueExecData) -> Self {
        PendingNode {
            kind: NodeKind::Value(data),
            cache: RefCell::new(None),
        }
    }

    fn combinator(kind: NodeKind) -> Self {
        PendingNode {
            kind,
            cache: RefCell::new(None),
        }
    }

    fn free_identifiers(&self, out: &mut BTreeSet<String>) {
        match &self.kind {
            NodeKind::Value(v) => out.extend(v.free_identifiers.iter().cloned()),
            NodeKind::And(l, r) | NodeKind::Or(l, r) => {
                l.free_identifiers(out);
                r.free_identifiers(out);
            }
            NodeKind::Not(operand) => operand.free_identifiers(out),
            NodeKind::Cond(c, t, a) => {
                c.free_identifiers(out);
                t.free_identifiers(out);
                a.free_identifiers(out);
            }
        }
    }
}

/// A compiled, not-yet-fully-evaluated boolean-shaped expression (§4.5,
/// §9: "pending execution"). Bindings arrive incrementally via `provide`;
/// `execute` short-circuits through `&&`/`||`/`?:` exactly like the
/// interpreter and memoizes every node it touches.
pub struct PendingExec {
    root: PendingNode,
    context: RefCell<HashMap<String, Value>>,
    runtime: Rc<dyn Runtime>,
}

/// Compiles `source` (one expression) into a pending execution driven by
/// `runtime` for its opaque value leaves.
pub fn compile(source: &str, runtime: Rc<dyn Runtime>) -> Result<PendingExec, ParseError> {
    let expr = parser::parse_expr_str(source)?;
    let builtins: HashSet<&str> = runtime.builtin_identifiers().iter().copied().collect();
    let root = build_node(&expr, &builtins);
    Ok(PendingExec {
        root,
        context: RefCell::new(HashMap::new()),
        runtime,
    })
}

impl PendingExec {
    /// Every identifier any leaf of this expression would need from the
    /// host before it can run, across the whole tree.
    pub fn free_identifiers(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.root.free_identifiers(&mut out);
        out
    }

    /// Binds `name` for subsequent evaluation and drops every memoized
    /// result, since a newly-provided value can change them.
    pub fn provide(&self, name: &str, value: Value) {
        self.context.borrow_mut().insert(name.to_string(), value);
        self.invalidate(&self.root);
    }

    fn invalidate(&self, node: &PendingNode) {
        *node.cache.borrow_mut() = None;
        match &node.kind {
            NodeKind::Value(_) => {}
            NodeKind::And(l, r) | NodeKind::Or(l, r) => {
                self.invalidate(l);
                self.invalidate(r);
            }
            NodeKind::Not(operand) => self.invalidate(operand),
            NodeKind::Cond(c, t, a) => {
                self.invalidate(c);
                self.invalidate(t);
                self.invalidate(a);
            }
        }
    }

    /// Whether `execute()` can run to completion right now, given the
    /// bindings provided so far (§4.5's combinator truth table): a `Value`
    /// leaf is executable iff its own free identifiers are all bound; `Not`
    /// mirrors its operand; `And`/`Or` are executable once both children
    /// are, or earlier if one child is executable and its value alone
    /// already short-circuits (a false left operand for `And`, a true left
    /// operand for `Or`); `Cond` needs its condition executable, then
    /// defers to whichever branch the condition's value selects.
    pub fn can_execute(&self) -> bool {
        self.can_execute_node(&self.root)
    }

    fn can_execute_node(&self, node: &PendingNode) -> bool {
        match &node.kind {
            NodeKind::Value(v) => {
                let ctx = self.context.borrow();
                v.free_identifiers.iter().all(|id| ctx.contains_key(id))
            }
            NodeKind::Not(operand) => self.can_execute_node(operand),
            NodeKind::And(l, r) => {
                if self.can_execute_node(l) {
                    if self.can_execute_node(r) {
                        return true;
                    }
                    if matches!(self.execute_node(l), Ok(lv) if !lv.is_truthy()) {
                        return true;
                    }
                }
                false
            }
            NodeKind::Or(l, r) => {
                if self.can_execute_node(l) {
                    if self.can_execute_node(r) {
                        return true;
                    }
                    if matches!(self.execute_node(l), Ok(lv) if lv.is_truthy()) {
                        return true;
                    }
                }
                false
            }
            NodeKind::Cond(c, t, f) => {
                if !self.can_execute_node(c) {
                    return false;
                }
                match self.execute_node(c) {
                    Ok(cv) if cv.is_truthy() => self.can_execute_node(t),
                    Ok(_) => self.can_execute_node(f),
                    Err(_) => false,
                }
            }
        }
    }

    /// Evaluates the tree, short-circuiting `&&`/`||`/`?:` and memoizing
    /// every node's result on first success.
    pub fn execute(&self) -> Result<Value, EvalError> {
        self.execute_node(&self.root)
    }

    fn execute_node(&self, node: &PendingNode) -> Result<Value, EvalError> {
        if let Some(cached) = node.cache.borrow().clone() {
            return Ok(cached);
        }
        let result = match &node.kind {
            NodeKind::Value(v) => {
                let ctx = self.context.borrow().clone();
                self.runtime.run(&v.source, &ctx)?
            }
            NodeKind::Not(operand) => {
                let v = self.execute_node(operand)?;
                Value::Boolean(!v.is_truthy())
            }
            NodeKind::And(l, r) => {
                let lv = self.execute_node(l)?;
                if !lv.is_truthy() {
                    lv
                } else {
                    self.execute_node(r)?
                }
            }
            NodeKind::Or(l, r) => {
                let lv = self.execute_node(l)?;
                if lv.is_truthy() {
                    lv
                } else {
                    self.execute_node(r)?
                }
            }
            NodeKind::Cond(c, t, f) => {
                let cv = self.execute_node(c)?;
                if cv.is_truthy() {
                    self.execute_node(t)?
                } else {
                    self.execute_node(f)?
                }
            }
        };
        *node.cache.borrow_mut() = Some(result.clone());
        Ok(result)
    }
}

fn build_node(expr: &Expr, builtins: &HashSet<&str>) -> PendingNode {
    match expr {
        Expr::Binary(op, lhs, rhs) if op.kind == TokenKind::AndAnd => PendingNode::combinator(
            NodeKind::And(Box::new(build_node(lhs, builtins)), Box::new(build_node(rhs, builtins))),
        ),
        Expr::Binary(op, lhs, rhs) if op.kind == TokenKind::OrOr => PendingNode::combinator(NodeKind::Or(
            Box::new(build_node(lhs, builtins)),
            Box::new(build_node(rhs, builtins)),
        )),
        Expr::Unary(op, operand) if op.kind == TokenKind::Bang => {
            PendingNode::combinator(NodeKind::Not(Box::new(build_node(operand, builtins))))
        }
        Expr::Ternary(_, cond, cons, alt) => PendingNode::combinator(NodeKind::Cond(
            Box::new(build_node(cond, builtins)),
            Box::new(build_node(cons, builtins)),
            Box::new(build_node(alt, builtins)),
        )),
        other => {
            let mut bound = Vec::new();
            let mut out = BTreeSet::new();
            collect_free_identifiers(other, &mut bound, builtins, &mut out);
            PendingNode::leaf(ValueExecData {
                source: other.to_string(),
                free_identifiers: out.into_iter().collect(),
            })
        }
    }
}

/// Collects the free identifiers of `expr` (§4.5): only the root of a
/// dotted chain counts (field names aren't variable references), lambda
/// parameters shadow their body, and names resolved by the built-in
/// catalog are excluded since the runtime supplies those itself.
fn collect_free_identifiers(
    expr: &Expr,
    bound: &mut Vec<String>,
    builtins: &HashSet<&str>,
    out: &mut BTreeSet<String>,
) {
    match expr {
        Expr::Leaf(tok) if tok.kind == TokenKind::Ident => {
            let name = tok.lexeme.to_string();
            if !bound.contains(&name) && !builtins.contains(name.as_str()) {
                out.insert(name);
            }
        }
        Expr::Leaf(_) => {}
        Expr::Unary(_, operand) => collect_free_identifiers(operand, bound, builtins, out),
        Expr::Binary(op, lhs, _rhs) if op.kind == TokenKind::Dot => {
            collect_free_identifiers(lhs, bound, builtins, out);
        }
        Expr::Binary(_, lhs, rhs) => {
            collect_free_identifiers(lhs, bound, builtins, out);
            collect_free_identifiers(rhs, bound, builtins, out);
        }
        Expr::Ternary(_, cond, cons, alt) => {
            collect_free_identifiers(cond, bound, builtins, out);
            collect_free_identifiers(cons, bound, builtins, out);
            collect_free_identifiers(alt, bound, builtins, out);
        }
        Expr::Subscript(_, base, index) => {
            collect_free_identifiers(base, bound, builtins, out);
            collect_free_identifiers(index, bound, builtins, out);
        }
        Expr::Call(callee, args, _) => {
            match fold_dotted_name(callee) {
                Some(name) if !builtins.contains(name.as_str()) => {
                    let root = name.split('.').next().unwrap_or(&name).to_string();
                    if !bound.contains(&root) {
                        out.insert(root);
                    }
                }
                Some(_) => {}
                None => collect_free_identifiers(callee, bound, builtins, out),
            }
            for a in args {
                collect_free_identifiers(a, bound, builtins, out);
            }
        }
        Expr::Lambda(params, body, _) => {
            let added: Vec<String> = params.iter().map(|p| p.to_string()).collect();
            bound.extend(added.iter().cloned());
            collect_free_identifiers(body, bound, builtins, out);
            for _ in &added {
                bound.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use crate::interpreter::Interpreter;

    struct ScriptRuntime;

    impl Runtime for ScriptRuntime {
        fn run(&self, expression_text: &str, context: &HashMap<String, Value>) -> Result<Value, EvalError> {
            let expr = parser::parse_expr_str(expression_text)
                .map_err(|e| EvalError::runtime_error("pending", e.to_string()))?;
            let env = Environment::new();
            for (k, v) in context {
                env.define(k.clone(), v.clone());
            }
            Interpreter::new().eval_expr(&expr, &env)
        }

        fn builtin_identifiers(&self) -> &[&str] {
            &[]
        }
    }

    struct CountingRuntime {
        calls: Rc<RefCell<usize>>,
    }

    impl Runtime for CountingRuntime {
        fn run(&self, expression_text: &str, context: &HashMap<String, Value>) -> Result<Value, EvalError> {
            *self.calls.borrow_mut() += 1;
            ScriptRuntime.run(expression_text, context)
        }

        fn builtin_identifiers(&self) -> &[&str] {
            &[]
        }
    }

    #[test]
    fn free_identifiers_are_dotted_chain_roots_only() {
        let pending = compile("a.b.c && d", Rc::new(ScriptRuntime)).unwrap();
        let ids = pending.free_identifiers();
        assert!(ids.contains("a"));
        assert!(ids.contains("d"));
        assert!(!ids.contains("b"));
        assert!(!ids.contains("c"));
    }

    #[test]
    fn can_execute_reflects_provided_bindings() {
        let pending = compile("a && b", Rc::new(ScriptRuntime)).unwrap();
        assert!(!pending.can_execute());
        pending.provide("a", Value::Boolean(true));
        assert!(!pending.can_execute());
        pending.provide("b", Value::Boolean(true));
        assert!(pending.can_execute());
    }

    #[test]
    fn a_false_left_operand_alone_makes_and_executable() {
        // §8: with only `a=false` provided, `b` is still unbound, but the
        // `&&` short-circuits on its false left operand, so canExecute is
        // already true and execute() returns false without needing `b`.
        let pending = compile("a && b", Rc::new(ScriptRuntime)).unwrap();
        pending.provide("a", Value::Boolean(false));
        assert!(pending.can_execute());
        assert!(matches!(pending.execute(), Ok(Value::Boolean(false))));
    }

    #[test]
    fn and_short_circuits_on_false_left() {
        let pending = compile("a && b", Rc::new(ScriptRuntime)).unwrap();
        pending.provide("a", Value::Boolean(false));
        // `b` was never provided; a correct short-circuit must not need it.
        let result = pending.execute().unwrap();
        assert!(matches!(result, Value::Boolean(false)));
    }

    #[test]
    fn or_short_circuits_on_true_left() {
        let pending = compile("a || b", Rc::new(ScriptRuntime)).unwrap();
        pending.provide("a", Value::Boolean(true));
        let result = pending.execute().unwrap();
        assert!(matches!(result, Value::Boolean(true)));
    }

    #[test]
    fn conditional_short_circuits() {
        let pending = compile("cond ? yes : no", Rc::new(ScriptRuntime)).unwrap();
        pending.provide("cond", Value::Boolean(true));
        pending.provide("yes", Value::Long(1));
        let result = pending.execute().unwrap();
        assert!(matches!(result, Value::Long(1)));
    }

    #[test]
    fn not_negates_truthiness() {
        let pending = compile("!a", Rc::new(ScriptRuntime)).unwrap();
        pending.provide("a", Value::Boolean(false));
        assert!(matches!(pending.execute().unwrap(), Value::Boolean(true)));
    }

    #[test]
    fn execute_is_memoized() {
        let calls = Rc::new(RefCell::new(0));
        let pending = compile("a && b", Rc::new(CountingRuntime { calls: calls.clone() })).unwrap();
        pending.provide("a", Value::Boolean(true));
        pending.provide("b", Value::Boolean(true));
        pending.execute().unwrap();
        let after_first = *calls.borrow();
        pending.execute().unwrap();
        assert_eq!(*calls.borrow(), after_first, "second execute should hit the memo cache");
    }

    #[test]
    fn provide_invalidates_the_memo_cache() {
        let pending = compile("a && b", Rc::new(ScriptRuntime)).unwrap();
        pending.provide("a", Value::Boolean(true));
        pending.provide("b", Value::Boolean(false));
        assert!(matches!(pending.execute().unwrap(), Value::Boolean(false)));
        pending.provide("b", Value::Boolean(true));
        assert!(matches!(pending.execute().unwrap(), Value::Boolean(true)));
    }
}
