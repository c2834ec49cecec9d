//! Header scanning and parsing
//!
//! Reads the text headers written by class-dump style tools and turns each
//! one into typed declarations plus recoverable diagnostics.

pub mod scanner;
pub mod lexer;
pub mod parser;
pub mod error;

pub use error::{DiagnosticKind, FileDiagnostic, ParseFatal, ParseWarning};
pub use parser::{parse_file, parse_header, ParsedHeader};
pub use scanner::{scan_headers, HeaderScanner};

use std::path::{Path, PathBuf};
use tracing::debug;

/// A parsed header together with where it came from
#[derive(Debug, Clone)]
pub struct HeaderFile {
    pub path: PathBuf,
    pub parsed: ParsedHeader,
}

impl HeaderFile {
    /// Read and parse `path`
    pub fn load(path: &Path) -> Self {
        let parsed = parse_file(path);
        for warning in &parsed.warnings {
            debug!("{}: {}", path.display(), warning);
        }
        if let Some(fatal) = &parsed.fatal {
            debug!("{}: {}", path.display(), fatal);
        }
        Self {
            path: path.to_path_buf(),
            parsed,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.parsed.fatal.is_some()
    }

    /// All warnings and the fatal error, if any, tagged with this file's path
    pub fn diagnostics(&self) -> Vec<FileDiagnostic> {
        let mut out: Vec<FileDiagnostic> = self
            .parsed
            .warnings
            .iter()
            .cloned()
            .map(|w| FileDiagnostic {
                path: self.path.clone(),
                kind: DiagnosticKind::Warning(w),
            })
            .collect();
        if let Some(fatal) = &self.parsed.fatal {
            out.push(FileDiagnostic {
                path: self.path.clone(),
                kind: DiagnosticKind::Fatal(fatal.clone()),
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_collects_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo.h");
        std::fs::write(&path, "@interface Foo : NSObject\nnonsense here\n").unwrap();

        let file = HeaderFile::load(&path);
        assert!(file.is_failed());
        let diags = file.diagnostics();
        assert_eq!(diags.len(), 2);
        assert!(!diags[0].is_fatal());
        assert!(diags[1].is_fatal());
        assert_eq!(diags[1].path, path);
    }
}
