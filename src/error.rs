// ABOUTME: Error types for lexing, parsing, and evaluation failures

use crate::token::Token;
use crate::value::Value;
use thiserror::Error;

// ===== Arity constant strings (eliminates allocations in error paths) =====
pub const ARITY_ONE: &str = "1";
pub const ARITY_TWO: &str = "2";
pub const ARITY_THREE: &str = "3";
pub const ARITY_AT_LEAST_ONE: &str = "at least 1";
pub const ARITY_ZERO_OR_ONE: &str = "0-1";
pub const ARITY_ONE_OR_TWO: &str = "1-2";
pub const ARITY_TWO_OR_THREE: &str = "2-3";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: unterminated regular expression literal")]
    UnterminatedRegex { line: usize },

    #[error("line {line}: '.' must be followed by an identifier, found {found:?}")]
    DanglingDot { line: usize, found: char },

    #[error("line {line}: unexpected character {found:?}")]
    UnexpectedChar { line: usize, found: char },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnterminatedString { line }
            | LexError::UnterminatedRegex { line }
            | LexError::DanglingDot { line, .. }
            | LexError::UnexpectedChar { line, .. } => *line,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("line {line}: expected {expected}, found {found:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
    },

    #[error("line {line}: trailing comma not allowed here")]
    TrailingComma { line: usize },

    #[error("line {line}: {message}")]
    Malformed { message: String, line: usize },

    #[error(transparent)]
    Lex(#[from] LexError),
}

impl ParseError {
    pub fn unexpected(expected: impl Into<String>, found: &Token) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: found.lexeme.to_string(),
            line: found.line,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            ParseError::UnexpectedToken { line, .. }
            | ParseError::TrailingComma { line }
            | ParseError::Malformed { line, .. } => *line,
            ParseError::Lex(e) => e.line(),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum EvalError {
    /// Type mismatch error with function name, expected type, actual type, and position.
    #[error("{function}: expected {expected}, got {actual} at argument {position}")]
    TypeMismatch {
        function: String,
        expected: String,
        actual: String,
        position: usize,
    },

    /// Arity error with function name, expected count/range, and actual count.
    #[error("{function}: expected {expected} argument{}, got {actual}", if *.expected == "1" { "" } else { "s" })]
    ArityError {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Runtime error with function context.
    #[error("{function}: {message}")]
    RuntimeError { function: String, message: String },

    #[error("not a function")]
    NotCallable,

    #[error("value is not iterable")]
    NotIterable,

    #[error("invalid assignment target")]
    InvalidAssignmentTarget,

    /// An uncaught `throw expr`, carrying the thrown value through `?` until a
    /// `try/catch` intercepts it.
    #[error("uncaught exception: {0}")]
    Thrown(Value),
}

impl EvalError {
    pub fn type_error(function: &str, expected: &str, actual: &Value, position: usize) -> Self {
        EvalError::TypeMismatch {
            function: function.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
            position,
        }
    }

    pub fn arity_error(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        EvalError::ArityError {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn runtime_error(function: &str, message: impl Into<String>) -> Self {
        EvalError::RuntimeError {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// Top-level error returned by [`crate::execute`] and [`crate::compile`].
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl From<LexError> for EngineError {
    fn from(e: LexError) -> Self {
        EngineError::Parse(ParseError::from(e))
    }
}
