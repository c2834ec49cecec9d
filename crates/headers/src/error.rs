//! Diagnostics produced while reading headers

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A header that could not be parsed to the end. Declarations completed
/// before the failure point are kept, the rest of the file is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFatal {
    #[error("line {line}: @{keyword} {name} is never closed with @end")]
    UnterminatedBlock {
        keyword: &'static str,
        name: String,
        line: usize,
    },

    #[error("line {line}: instance variable block of {name} is never closed")]
    UnterminatedIvars { name: String, line: usize },

    #[error("cannot read header: {0}")]
    Unreadable(String),
}

/// A line or member the parser skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub line: usize,
    pub message: String,
}

impl ParseWarning {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// A diagnostic tied to the file it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiagnostic {
    pub path: PathBuf,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Warning(ParseWarning),
    Fatal(ParseFatal),
}

impl FileDiagnostic {
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, DiagnosticKind::Fatal(_))
    }
}

impl fmt::Display for FileDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::Warning(w) => write!(f, "{}: warning: {}", self.path.display(), w),
            DiagnosticKind::Fatal(e) => write!(f, "{}: error: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diag = FileDiagnostic {
            path: PathBuf::from("Foo.h"),
            kind: DiagnosticKind::Fatal(ParseFatal::UnterminatedBlock {
                keyword: "interface",
                name: "Foo".to_string(),
                line: 3,
            }),
        };
        assert!(diag.is_fatal());
        assert_eq!(diag.to_string(), "Foo.h: error: line 3: @interface Foo is never closed with @end");

        let warn = FileDiagnostic {
            path: PathBuf::from("Bar.h"),
            kind: DiagnosticKind::Warning(ParseWarning::new(7, "unrecognized line")),
        };
        assert_eq!(warn.to_string(), "Bar.h: warning: line 7: unrecognized line");
    }
}
