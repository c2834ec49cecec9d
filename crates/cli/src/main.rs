//! objcat - converts dumped Objective-C headers into a `.extracted` catalog.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use objcat_catalog::{run, RunReport};
use objcat_core::{CatalogOptions, EventBus, OutputFormat, RunConfig, RunEvent};

/// Build a patching-tool catalog from class-dump headers.
#[derive(Parser, Debug)]
#[command(name = "objcat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Framework name, used for the output file name (e.g. "UIKitCore")
    name: String,

    /// Directory containing the dumped headers (searched recursively)
    headers: PathBuf,

    /// Output path (default: ./<NAME>.extracted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// JSON run configuration; command-line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write three-key records without synthesized accessors
    #[arg(long)]
    legacy: bool,

    /// Keep classes and protocols that have no methods
    #[arg(long)]
    include_empty: bool,

    /// Do not add getter/setter records for properties
    #[arg(long)]
    no_accessors: bool,

    /// Parse headers on a single thread
    #[arg(long)]
    sequential: bool,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Property-list catalog
    Catalog,
    /// JSON dump of the parsed model
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Catalog => OutputFormat::Catalog,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let code = match execute(cli) {
        Ok(report) => {
            print_summary(&report);
            report.exit_code()
        }
        Err(err) => {
            error!("{:#}", err);
            err.downcast_ref::<objcat_core::Error>()
                .map(objcat_core::Error::exit_code)
                .unwrap_or(1)
        }
    };

    process::exit(code);
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).ok();
}

fn build_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => RunConfig::default(),
    };

    config.framework_name = cli.name.clone();
    config.headers_dir = cli.headers.clone();
    if cli.output.is_some() {
        config.output = cli.output.clone();
    }
    if let Some(format) = cli.format {
        config.format = format.into();
    }
    if cli.legacy {
        config.catalog = CatalogOptions::legacy();
    }
    if cli.include_empty {
        config.catalog.include_empty = true;
    }
    if cli.no_accessors {
        config.catalog.synthesize_accessors = false;
    }
    if cli.sequential {
        config.parallel = false;
    }

    Ok(config)
}

fn execute(cli: Cli) -> Result<RunReport> {
    let config = build_config(&cli)?;
    info!(
        "Converting {} from {}",
        config.framework_name,
        config.headers_dir.display()
    );

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} headers")?
            .progress_chars("#>-"),
    );

    let mut events = EventBus::new();
    let bar = progress.clone();
    events.subscribe(move |event| match event {
        RunEvent::ScanCompleted { files, .. } => bar.set_length(*files as u64),
        RunEvent::FileParsed { .. } | RunEvent::FileFailed { .. } => bar.inc(1),
        RunEvent::Assembled { .. } => bar.finish_and_clear(),
        RunEvent::Written { .. } => {}
    });

    let result = run(&config, &events);
    progress.finish_and_clear();
    Ok(result?)
}

fn print_summary(report: &RunReport) {
    for diagnostic in &report.diagnostics {
        warn!("{}", diagnostic);
    }

    println!(
        "Wrote {} ({} symbols, {} methods) in {:.2}s",
        report.output.display(),
        report.symbols,
        report.methods,
        report.elapsed.as_secs_f64()
    );
    if report.failed_files > 0 || report.warning_count() > 0 {
        println!(
            "{} of {} headers failed, {} warnings",
            report.failed_files,
            report.files,
            report.warning_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "objcat",
            "UIKitCore",
            "/tmp/headers",
            "--legacy",
            "--include-empty",
            "--sequential",
            "--format",
            "json",
        ]);
        let config = build_config(&cli).unwrap();

        assert_eq!(config.framework_name, "UIKitCore");
        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.catalog.extended_records);
        assert!(config.catalog.include_empty);
        assert!(!config.parallel);
        assert_eq!(config.output_path(), PathBuf::from("UIKitCore.json"));
    }

    #[test]
    fn test_config_file_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objcat.json");
        let mut saved = RunConfig::new("Ignored", "/ignored");
        saved.header_extensions = vec!["hh".to_string()];
        saved.catalog.synthesize_accessors = false;
        saved.save(&path).unwrap();

        let cli = Cli::parse_from(["objcat", "Foo", "/headers", "-c", path.to_str().unwrap()]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.framework_name, "Foo");
        assert_eq!(config.header_extensions, vec!["hh".to_string()]);
        assert!(!config.catalog.synthesize_accessors);
        assert!(config.catalog.extended_records);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = Cli::parse_from(["objcat", "Foo", "/headers", "--config", "/nonexistent/objcat.json"]);
        let err = build_config(&cli).unwrap_err();
        let code = err
            .downcast_ref::<objcat_core::Error>()
            .map(objcat_core::Error::exit_code);
        assert_eq!(code, Some(1));
    }
}
