//! Header discovery under a framework root

use objcat_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Recursive header scanner
#[derive(Debug, Clone)]
pub struct HeaderScanner {
    extensions: Vec<String>,
}

impl Default for HeaderScanner {
    fn default() -> Self {
        Self::new(vec!["h".to_string()])
    }
}

impl HeaderScanner {
    pub fn new(extensions: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self { extensions }
    }

    fn is_header(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// List header files under `root`, sorted by their path relative to it
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(Error::input(format!("{} does not exist", root.display())));
        }
        if !root.is_dir() {
            return Err(Error::input(format!("{} is not a directory", root.display())));
        }

        let mut headers = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };
            if entry.file_type().is_file() && self.is_header(entry.path()) {
                headers.push(entry.into_path());
            }
        }

        if headers.is_empty() {
            return Err(Error::input(format!(
                "no .{} files found under {}",
                self.extensions.join("/."),
                root.display()
            )));
        }

        headers.sort_by(|a, b| {
            let a = a.strip_prefix(root).unwrap_or(a);
            let b = b.strip_prefix(root).unwrap_or(b);
            a.cmp(b)
        });

        for path in &headers {
            debug!("Found header {:?}", path);
        }
        info!("Found {} headers under {:?}", headers.len(), root);

        Ok(headers)
    }
}

/// Scan with the default `.h` filter
pub fn scan_headers(root: &Path) -> Result<Vec<PathBuf>> {
    HeaderScanner::default().scan(root)
}
