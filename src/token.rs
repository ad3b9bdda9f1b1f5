// ABOUTME: Token types produced by the lexer and consumed by both parsers

use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    Number,
    Str,
    Regex,
    Ident,
    True,
    False,
    Nil,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Colon,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    StarStar,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    UShr,

    // Comparison
    EqEq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,

    // Logic
    AndAnd,
    OrOr,
    Bang,

    // Conditional / assignment / regex-match
    Question,
    Eq,
    RegexMatch,

    // Dot / arrow
    Dot,
    Arrow,

    // Keywords
    KwIf,
    KwElse,
    KwElsif,
    KwFor,
    KwIn,
    KwWhile,
    KwBreak,
    KwContinue,
    KwReturn,
    KwTry,
    KwCatch,
    KwFinally,
    KwThrow,
    KwFn,
    KwLambda,
    KwEnd,
    KwLet,
    KwNew,
    KwUse,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Rc<str>,
    pub start: usize,
    pub end: usize,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<Rc<str>>, start: usize, end: usize, line: usize) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            start,
            end,
            line,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lexeme)
    }
}
