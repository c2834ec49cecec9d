//! Conversion run: scan, parse, assemble, serialize, write

use crate::assembler::Assembler;
use crate::output::{CatalogGenerator, ModelJson};
use objcat_core::{Error, EventBus, Framework, OutputFormat, Result, RunConfig, RunEvent};
use objcat_headers::{FileDiagnostic, HeaderFile, HeaderScanner};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output: PathBuf,
    pub files: usize,
    pub failed_files: usize,
    pub symbols: usize,
    pub methods: usize,
    pub bytes: usize,
    pub diagnostics: Vec<FileDiagnostic>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| !d.is_fatal()).count()
    }

    /// `0` for a clean run, `2` when anything was skipped or failed
    pub fn exit_code(&self) -> i32 {
        if self.diagnostics.is_empty() && self.failed_files == 0 {
            0
        } else {
            2
        }
    }
}

/// Parse every header; the result keeps the input order in both modes
pub fn parse_all(paths: &[PathBuf], parallel: bool) -> Vec<HeaderFile> {
    if parallel {
        paths.par_iter().map(|p| HeaderFile::load(p)).collect()
    } else {
        paths.iter().map(|p| HeaderFile::load(p)).collect()
    }
}

/// Render the framework in the configured format
pub fn render(framework: &Framework, config: &RunConfig) -> Result<String> {
    match config.format {
        OutputFormat::Catalog => CatalogGenerator::generate(framework, &config.catalog),
        OutputFormat::Json => ModelJson::generate(framework),
    }
}

/// Execute a full run
pub fn run(config: &RunConfig, events: &EventBus) -> Result<RunReport> {
    let start = Instant::now();
    config.validate()?;

    let root = config.headers_dir.as_path();
    let scanner = HeaderScanner::new(config.header_extensions.clone());
    let paths = scanner.scan(root)?;
    events.emit(RunEvent::ScanCompleted {
        root: root.to_path_buf(),
        files: paths.len(),
    });

    info!(
        "Parsing {} headers{}",
        paths.len(),
        if config.parallel { " in parallel" } else { "" }
    );
    let files = parse_all(&paths, config.parallel);

    let mut assembler = Assembler::new(config.framework_name.trim());
    let mut diagnostics = Vec::new();
    let mut failed_files = 0;
    for file in &files {
        match &file.parsed.fatal {
            Some(fatal) => {
                failed_files += 1;
                events.emit(RunEvent::FileFailed {
                    path: file.path.clone(),
                    reason: fatal.to_string(),
                });
            }
            None => events.emit(RunEvent::FileParsed {
                path: file.path.clone(),
                declarations: file.parsed.declarations.len(),
                warnings: file.parsed.warnings.len(),
            }),
        }
        diagnostics.extend(file.diagnostics());
        assembler.add_file(file);
    }

    let framework = assembler.finish();
    events.emit(RunEvent::Assembled {
        symbols: framework.symbols().len(),
        methods: framework.method_count(),
    });

    let contents = render(&framework, config)?;
    let output = config.output_path();
    write_atomic(&output, contents.as_bytes())?;
    events.emit(RunEvent::Written {
        path: output.clone(),
        bytes: contents.len(),
    });

    if failed_files > 0 {
        warn!("{} of {} headers could not be parsed", failed_files, files.len());
    }
    info!("Wrote {:?} ({} bytes)", output, contents.len());

    Ok(RunReport {
        output,
        files: files.len(),
        failed_files,
        symbols: framework.symbols().len(),
        methods: framework.method_count(),
        bytes: contents.len(),
        diagnostics,
        elapsed: start.elapsed(),
    })
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
/// Nothing at `path` changes unless the whole write succeeded.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    debug!("Writing {:?} via {:?}", path, tmp);

    let result = write_file(&tmp, contents).and_then(|_| fs::rename(&tmp, path));
    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(Error::Write {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "catalog".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Foo.extracted");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomic_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("Foo.extracted");

        let err = write_atomic(&path, b"data").unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
        assert_eq!(err.exit_code(), 3);
        assert!(!path.exists());
    }

    #[test]
    fn test_report_exit_code() {
        let report = RunReport {
            output: PathBuf::from("Foo.extracted"),
            files: 1,
            failed_files: 0,
            symbols: 1,
            methods: 1,
            bytes: 10,
            diagnostics: Vec::new(),
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.exit_code(), 0);

        let failed = RunReport {
            failed_files: 1,
            ..report
        };
        assert_eq!(failed.exit_code(), 2);
    }

    #[test]
    fn test_parse_all_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..8 {
            let path = dir.path().join(format!("C{}.h", i));
            fs::write(&path, format!("@interface C{} : NSObject\n- (void)m;\n@end\n", i)).unwrap();
            paths.push(path);
        }

        let parallel = parse_all(&paths, true);
        let sequential = parse_all(&paths, false);
        let names = |files: &[HeaderFile]| {
            files
                .iter()
                .map(|f| f.parsed.declarations[0].name().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&parallel), names(&sequential));
        assert_eq!(names(&parallel)[3], "C3");
    }
}
