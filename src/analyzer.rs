// ABOUTME: Static analyzer (§4.6): a coarse type lattice walked over the AST
// ABOUTME: with a scope chain mirroring the interpreter's, producing diagnostics without executing.

use crate::ast::{Expr, Stmt};
use crate::diagnostics::Diagnostic;
use crate::interpreter::fold_dotted_name;
use crate::token::{Token, TokenKind};
use std::collections::HashMap;

/// The coarse type lattice the analyzer reasons in. Every runtime `Value`
/// kind maps to exactly one of these; `Any` is the top element used
/// whenever a precise kind can't be determined statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ty {
    Long,
    Double,
    BigInt,
    Decimal,
    Str,
    Boolean,
    Nil,
    Pattern,
    List,
    Map,
    Set,
    Void,
    Any,
}

/// Maps a catalog entry's `returns` string (§6) onto the lattice.
pub fn ty_from_catalog_name(returns: &str) -> Ty {
    match returns {
        "long" => Ty::Long,
        "double" => Ty::Double,
        "bigint" => Ty::BigInt,
        "decimal" => Ty::Decimal,
        "string" => Ty::Str,
        "boolean" => Ty::Boolean,
        "nil" => Ty::Nil,
        "pattern" => Ty::Pattern,
        "list" => Ty::List,
        "map" => Ty::Map,
        "set" => Ty::Set,
        "void" => Ty::Void,
        _ => Ty::Any,
    }
}

fn boolean_compatible(t: Ty) -> bool {
    matches!(t, Ty::Boolean | Ty::Any)
}

/// Renders a lattice member the way a diagnostic message names it —
/// the inverse of [`ty_from_catalog_name`].
fn ty_name(t: Ty) -> &'static str {
    match t {
        Ty::Long => "long",
        Ty::Double => "double",
        Ty::BigInt => "bigint",
        Ty::Decimal => "decimal",
        Ty::Str => "string",
        Ty::Boolean => "boolean",
        Ty::Nil => "nil",
        Ty::Pattern => "pattern",
        Ty::List => "list",
        Ty::Map => "map",
        Ty::Set => "set",
        Ty::Void => "void",
        Ty::Any => "any",
    }
}

fn promote(a: Ty, b: Ty) -> Ty {
    if a == Ty::Any || b == Ty::Any {
        return Ty::Any;
    }
    let rank = |t: Ty| match t {
        Ty::Long => Some(1),
        Ty::BigInt => Some(2),
        Ty::Double => Some(3),
        Ty::Decimal => Some(4),
        _ => None,
    };
    match (rank(a), rank(b)) {
        (Some(ra), Some(rb)) => match ra.max(rb) {
            1 => Ty::Long,
            2 => Ty::BigInt,
            3 => Ty::Double,
            _ => Ty::Decimal,
        },
        _ => Ty::Any,
    }
}

fn infer_number_ty(lexeme: &str) -> Ty {
    match lexeme.chars().last() {
        Some('N') => Ty::BigInt,
        Some('M') => Ty::Double,
        _ => {
            if lexeme.contains('.') || lexeme.contains('e') || lexeme.contains('E') {
                Ty::Double
            } else {
                Ty::Long
            }
        }
    }
}

/// Walks a parsed script, threading a scope chain that mirrors the
/// interpreter's (§4.6), and collects diagnostics without ever executing
/// anything.
pub struct Analyzer {
    scopes: Vec<HashMap<String, Ty>>,
    diagnostics: Vec<Diagnostic>,
}

impl Analyzer {
    /// `type_env` seeds the root scope alongside the built-in catalog
    /// (caller-supplied context types, §4.6).
    pub fn new(catalog: &[(&str, &str)], type_env: &HashMap<String, Ty>) -> Self {
        let mut root = HashMap::new();
        for (name, returns) in catalog {
            root.insert(name.to_string(), ty_from_catalog_name(returns));
        }
        for (name, ty) in type_env {
            root.insert(name.clone(), *ty);
        }
        Analyzer {
            scopes: vec![root],
            diagnostics: Vec::new(),
        }
    }

    pub fn analyze_script(mut self, stmts: &[Stmt]) -> Vec<Diagnostic> {
        for stmt in stmts {
            self.analyze_stmt(stmt);
        }
        self.diagnostics
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn define(&mut self, name: &str, ty: Ty) {
        self.scopes.last_mut().expect("root scope always present").insert(name.to_string(), ty);
    }

    fn lookup(&self, name: &str) -> Option<Ty> {
        self.scopes.iter().rev().find_map(|s| s.get(name).copied())
    }

    fn lookup_root(&self, name: &str) -> Option<Ty> {
        self.scopes[0].get(name).copied()
    }

    fn assign(&mut self, name: &str, ty: Ty) {
        for scope in self.scopes.iter_mut().rev() {
            if scope.contains_key(name) {
                scope.insert(name.to_string(), ty);
                return;
            }
        }
        self.define(name, ty);
    }

    fn check_boolean_condition(&mut self, ctx: &str, cond: &Expr) {
        let t = self.analyze_expr(cond);
        if !boolean_compatible(t) {
            self.diagnostics.push(Diagnostic::error(
                "analyzer",
                cond.line(),
                format!("'{ctx}' condition expects boolean, got {}", ty_name(t)),
            ));
        }
    }

    fn analyze_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::ExprStmt { expr, .. } => {
                self.analyze_expr(expr);
            }
            Stmt::Let { name, init, .. } => {
                let t = self.analyze_expr(init);
                self.define(name, t);
            }
            Stmt::If {
                cond,
                then_branch,
                elsifs,
                else_branch,
            } => {
                self.check_boolean_condition("if", cond);
                self.analyze_block(then_branch);
                for clause in elsifs {
                    self.check_boolean_condition("if", &clause.cond);
                    self.analyze_block(&clause.body);
                }
                if let Some(b) = else_branch {
                    self.analyze_block(b);
                }
            }
            Stmt::While { cond, body } => {
                self.check_boolean_condition("while", cond);
                self.analyze_block(body);
            }
            Stmt::For {
                index_name,
                item_name,
                iterable,
                body,
            } => {
                self.analyze_expr(iterable);
                self.push_scope();
                if let Some(idx) = index_name {
                    self.define(idx, Ty::Any);
                }
                self.define(item_name, Ty::Any);
                for s in body {
                    self.analyze_stmt(s);
                }
                self.pop_scope();
            }
            Stmt::Fn {
                name, params, body, ..
            } => {
                self.define(name, Ty::Any);
                self.push_scope();
                for p in params {
                    self.define(p, Ty::Any);
                }
                for s in body {
                    self.analyze_stmt(s);
                }
                self.pop_scope();
            }
            Stmt::Return { expr, .. } => {
                if let Some(e) = expr {
                    self.analyze_expr(e);
                }
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => {}
            Stmt::Block(stmts) => self.analyze_block(stmts),
            Stmt::Try {
                try_block,
                catch_name,
                catch_block,
                finally_block,
            } => {
                self.analyze_block(try_block);
                if let Some(cb) = catch_block {
                    self.push_scope();
                    if let Some(n) = catch_name {
                        self.define(n, Ty::Any);
                    }
                    for s in cb {
                        self.analyze_stmt(s);
                    }
                    self.pop_scope();
                }
                if let Some(fb) = finally_block {
                    self.analyze_block(fb);
                }
            }
            Stmt::Throw { expr, .. } => {
                self.analyze_expr(expr);
            }
        }
    }

    fn analyze_block(&mut self, stmts: &[Stmt]) {
        self.push_scope();
        for s in stmts {
            self.analyze_stmt(s);
        }
        self.pop_scope();
    }

    fn analyze_expr(&mut self, expr: &Expr) -> Ty {
        match expr {
            Expr::Leaf(tok) => self.analyze_leaf(tok),
            Expr::Unary(op, operand) => {
                let t = self.analyze_expr(operand);
                match op.kind {
                    TokenKind::Bang => {
                        if !boolean_compatible(t) {
                            self.diagnostics.push(Diagnostic::error(
                                "analyzer",
                                op.line,
                                "'!' requires a boolean operand",
                            ));
                        }
                        Ty::Boolean
                    }
                    TokenKind::Minus | TokenKind::Tilde => t,
                    _ => unreachable!("parser only produces - ! ~ as prefix operators"),
                }
            }
            Expr::Binary(op, lhs, rhs) => self.analyze_binary(op, lhs, rhs),
            Expr::Ternary(_, cond, cons, alt) => {
                self.check_boolean_condition("?:", cond);
                let a = self.analyze_expr(cons);
                let b = self.analyze_expr(alt);
                if a == b {
                    a
                } else {
                    Ty::Any
                }
            }
            Expr::Subscript(_, base, index) => {
                self.analyze_expr(base);
                self.analyze_expr(index);
                Ty::Any
            }
            Expr::Call(callee, args, _) => {
                for a in args {
                    self.analyze_expr(a);
                }
                self.analyze_callee_ty(callee)
            }
            Expr::Lambda(params, body, _) => {
                self.push_scope();
                for p in params {
                    self.define(p, Ty::Any);
                }
                self.analyze_expr(body);
                self.pop_scope();
                Ty::Any
            }
        }
    }

    fn analyze_leaf(&mut self, tok: &Token) -> Ty {
        match tok.kind {
            TokenKind::Number => infer_number_ty(&tok.lexeme),
            TokenKind::Str => Ty::Str,
            TokenKind::Regex => Ty::Pattern,
            TokenKind::True | TokenKind::False => Ty::Boolean,
            TokenKind::Nil => Ty::Nil,
            TokenKind::Ident => match self.lookup(&tok.lexeme) {
                Some(t) => t,
                None => {
                    self.diagnostics.push(Diagnostic::error(
                        "analyzer",
                        tok.line,
                        format!("Undefined variable '{}'", tok.lexeme),
                    ));
                    Ty::Any
                }
            },
            _ => unreachable!("parser only produces literal/identifier leaves"),
        }
    }

    fn analyze_binary(&mut self, op: &Token, lhs: &Expr, rhs: &Expr) -> Ty {
        use TokenKind::*;
        match op.kind {
            Eq => {
                let rt = self.analyze_expr(rhs);
                if let Expr::Leaf(tok) = lhs {
                    if tok.kind == Ident {
                        self.assign(&tok.lexeme, rt);
                        return rt;
                    }
                }
                self.analyze_expr(lhs);
                rt
            }
            Dot => {
                self.analyze_expr(lhs);
                Ty::Any
            }
            AndAnd | OrOr => {
                let a = self.analyze_expr(lhs);
                let b = self.analyze_expr(rhs);
                if !boolean_compatible(a) {
                    self.diagnostics.push(Diagnostic::error(
                        "analyzer",
                        op.line,
                        format!("Left operand of '{}' must be boolean, got {}", op.lexeme, ty_name(a)),
                    ));
                }
                if !boolean_compatible(b) {
                    self.diagnostics.push(Diagnostic::error(
                        "analyzer",
                        op.line,
                        format!("Right operand of '{}' must be boolean, got {}", op.lexeme, ty_name(b)),
                    ));
                }
                Ty::Boolean
            }
            RegexMatch | EqEq | NotEq | Lt | Le | Gt | Ge => {
                self.analyze_expr(lhs);
                self.analyze_expr(rhs);
                Ty::Boolean
            }
            Shl | Shr | UShr | Amp | Pipe | Caret => {
                self.analyze_expr(lhs);
                self.analyze_expr(rhs);
                Ty::Long
            }
            Plus => {
                let a = self.analyze_expr(lhs);
                let b = self.analyze_expr(rhs);
                if a == Ty::Str || b == Ty::Str {
                    Ty::Str
                } else {
                    promote(a, b)
                }
            }
            Minus | Star | Slash | Percent | StarStar => {
                let a = self.analyze_expr(lhs);
                let b = self.analyze_expr(rhs);
                promote(a, b)
            }
            _ => unreachable!("parser only produces known binary operator kinds"),
        }
    }

    /// Resolves a call's callee the same way the interpreter does: a
    /// flattened dotted name is looked up against the root scope first
    /// (§4.6); falling through re-analyzes the callee expression itself,
    /// which surfaces an undefined-variable diagnostic if its root
    /// identifier has no binding anywhere in scope.
    fn analyze_callee_ty(&mut self, callee: &Expr) -> Ty {
        if let Some(name) = fold_dotted_name(callee) {
            if let Some(t) = self.lookup_root(&name) {
                return t;
            }
        }
        self.analyze_expr(callee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn analyze(src: &str) -> Vec<Diagnostic> {
        let stmts = parser::parse_script(src).unwrap();
        Analyzer::new(&[], &HashMap::new()).analyze_script(&stmts)
    }

    #[test]
    fn undefined_variable_is_reported() {
        let diags = analyze("let x = y + 1;");
        assert!(diags.iter().any(|d| d.message.contains("Undefined variable 'y'")));
    }

    #[test]
    fn non_boolean_if_condition_is_reported() {
        let diags = analyze("if (1 + 2) { 1 }");
        assert!(diags
            .iter()
            .any(|d| d.message.contains("'if' condition expects boolean, got long")));
    }

    #[test]
    fn non_boolean_and_operand_is_reported() {
        let diags = analyze("let a = 1 && true;");
        assert!(diags
            .iter()
            .any(|d| d.message.contains("Left operand of '&&' must be boolean, got long")));
    }

    #[test]
    fn defined_variable_does_not_report() {
        let diags = analyze("let x = 1; let y = x + 2;");
        assert!(diags.is_empty());
    }

    #[test]
    fn for_loop_binds_index_and_item_as_any() {
        let diags = analyze("for i, x in xs { let y = x + i; }");
        // xs itself is undefined, but i/x should not additionally be flagged.
        assert_eq!(diags.iter().filter(|d| d.message.contains("Undefined variable")).count(), 1);
    }

    #[test]
    fn catalog_seeds_root_scope() {
        let stmts = parser::parse_script("println(1)").unwrap();
        let diags = Analyzer::new(&[("println", "void")], &HashMap::new()).analyze_script(&stmts);
        assert!(diags.is_empty());
    }
}
