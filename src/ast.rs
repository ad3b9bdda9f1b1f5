// ABOUTME: Expression and statement trees shared by both parsers, the interpreter,
// ABOUTME: the pending-execution engine, and the static analyzer.

use crate::token::{Token, TokenKind};
use std::fmt;
use std::rc::Rc;

/// The expression tree (§3: Leaf / Node / Call / Lambda).
///
/// `Unary`, `Binary`, `Subscript` and `Ternary` are all "Node" in the spec's
/// terms, split into concrete variants here so the interpreter, analyzer and
/// pending-execution factory can match exhaustively without re-deriving
/// arity from an operand-count field.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A terminal literal or identifier reference.
    Leaf(Token),
    /// Prefix `- ! ~`.
    Unary(Token, Box<Expr>),
    /// Any two-operand operator, including `=`, `=~`, `.` and assignment.
    Binary(Token, Box<Expr>, Box<Expr>),
    /// `a ? b : c`, operator token kept for line/diagnostics purposes.
    Ternary(Token, Box<Expr>, Box<Expr>, Box<Expr>),
    /// `a[b]`; the bracket token is kept for its line.
    Subscript(Token, Box<Expr>, Box<Expr>),
    /// Function application; callee is itself an expression.
    Call(Box<Expr>, Vec<Expr>, Token),
    /// `lambda (params) -> body end`.
    Lambda(Vec<Rc<str>>, Box<Expr>, Token),
}

impl Expr {
    /// The source line this expression's leading token was on, used by the
    /// analyzer and pending-execution engine to attribute diagnostics.
    pub fn line(&self) -> usize {
        match self {
            Expr::Leaf(tok) => tok.line,
            Expr::Unary(tok, _) => tok.line,
            Expr::Binary(tok, ..) => tok.line,
            Expr::Ternary(tok, ..) => tok.line,
            Expr::Subscript(tok, ..) => tok.line,
            Expr::Call(_, _, tok) => tok.line,
            Expr::Lambda(_, _, tok) => tok.line,
        }
    }
}

/// Re-serializes an expression tree back into valid source text, fully
/// parenthesizing every non-leaf subexpression so the round trip never
/// depends on reconstructing the binding-power table (§8: re-serialization
/// round-trips modulo identity). Used by the pending-execution factory to
/// hand a `ValueExec` leaf's source text to the host runtime.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Leaf(tok) => write!(f, "{}", tok.lexeme),
            Expr::Unary(op, operand) => write!(f, "{}{}", op.lexeme, Self::parenthesized(operand)),
            Expr::Binary(op, lhs, rhs) if op.kind == TokenKind::Dot => {
                write!(f, "{}.{}", Self::parenthesized(lhs), rhs)
            }
            Expr::Binary(op, lhs, rhs) => {
                write!(f, "{} {} {}", Self::parenthesized(lhs), op.lexeme, Self::parenthesized(rhs))
            }
            Expr::Ternary(_, cond, cons, alt) => write!(
                f,
                "{} ? {} : {}",
                Self::parenthesized(cond),
                Self::parenthesized(cons),
                Self::parenthesized(alt)
            ),
            Expr::Subscript(_, base, index) => write!(f, "{}[{}]", Self::parenthesized(base), index),
            Expr::Call(callee, args, _) => {
                write!(f, "{}(", Self::parenthesized(callee))?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expr::Lambda(params, body, _) => {
                let params = params.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
                write!(f, "lambda({params}) -> {body} end")
            }
        }
    }
}

impl Expr {
    fn parenthesized(e: &Expr) -> String {
        match e {
            Expr::Leaf(_) | Expr::Call(..) | Expr::Subscript(..) => e.to_string(),
            _ => format!("({e})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElsifClause {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

/// The statement tree (§3).
#[derive(Debug, Clone)]
pub enum Stmt {
    ExprStmt {
        expr: Expr,
        had_semicolon: bool,
    },
    Let {
        name: Rc<str>,
        init: Expr,
        line: usize,
    },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        elsifs: Vec<ElsifClause>,
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        index_name: Option<Rc<str>>,
        item_name: Rc<str>,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Fn {
        name: Rc<str>,
        params: Vec<Rc<str>>,
        body: Vec<Stmt>,
        line: usize,
    },
    Return {
        expr: Option<Expr>,
        line: usize,
    },
    Break {
        line: usize,
    },
    Continue {
        line: usize,
    },
    Block(Vec<Stmt>),
    Try {
        try_block: Vec<Stmt>,
        catch_name: Option<Rc<str>>,
        catch_block: Option<Vec<Stmt>>,
        finally_block: Option<Vec<Stmt>>,
    },
    Throw {
        expr: Expr,
        line: usize,
    },
}

impl Stmt {
    pub fn line(&self) -> usize {
        match self {
            Stmt::ExprStmt { expr, .. } => expr.line(),
            Stmt::Let { line, .. }
            | Stmt::Fn { line, .. }
            | Stmt::Return { line, .. }
            | Stmt::Break { line }
            | Stmt::Continue { line }
            | Stmt::Throw { line, .. } => *line,
            Stmt::If { cond, .. } => cond.line(),
            Stmt::While { cond, .. } => cond.line(),
            Stmt::For { iterable, .. } => iterable.line(),
            Stmt::Block(stmts) => stmts.first().map(Stmt::line).unwrap_or(0),
            Stmt::Try { try_block, .. } => try_block.first().map(Stmt::line).unwrap_or(0),
        }
    }
}
