// ABOUTME: Diagnostics-as-data (§6): the shape every analyzer finding and
// ABOUTME: parser-recovery error is rendered into for host consumption.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Information,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "information",
        };
        write!(f, "{s}")
    }
}

/// One analyzer finding or parse-recovery note, in the host-agnostic shape
/// `{message, line, column?, severity, source}` (§6).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
    pub column: Option<usize>,
    pub severity: Severity,
    pub source: &'static str,
}

impl Diagnostic {
    pub fn error(source: &'static str, line: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            line,
            column: None,
            severity: Severity::Error,
            source,
        }
    }

    pub fn warning(source: &'static str, line: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            line,
            column: None,
            severity: Severity::Warning,
            source,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] line {}: {}", self.severity, self.source, self.line, self.message)
    }
}
