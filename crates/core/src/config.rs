//! Run configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Catalog file extension expected by the patching tool
pub const CATALOG_EXTENSION: &str = "extracted";

/// Everything one conversion run needs. Built by the caller and passed in;
/// nothing is read from ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Framework name, also the output file stem
    pub framework_name: String,
    /// Root of the dumped header tree
    pub headers_dir: PathBuf,
    /// Explicit output path; defaults to `<name>.<ext>` in the working directory
    pub output: Option<PathBuf>,
    /// Output format
    pub format: OutputFormat,
    /// Header file extensions to scan (without the dot)
    pub header_extensions: Vec<String>,
    /// Parse files on the rayon pool
    pub parallel: bool,
    /// Catalog record options
    pub catalog: CatalogOptions,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            framework_name: String::new(),
            headers_dir: PathBuf::new(),
            output: None,
            format: OutputFormat::Catalog,
            header_extensions: vec!["h".to_string()],
            parallel: true,
            catalog: CatalogOptions::default(),
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Property-list catalog read by the patching tool
    Catalog,
    /// JSON dump of the assembled model
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Catalog => CATALOG_EXTENSION,
            OutputFormat::Json => "json",
        }
    }
}

/// Options controlling the shape of catalog records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOptions {
    /// Emit `kind`, `properties` and `protocols` keys in each record
    pub extended_records: bool,
    /// Add getter/setter method records for declared properties
    pub synthesize_accessors: bool,
    /// Keep symbols that end up without any method record
    pub include_empty: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            extended_records: true,
            synthesize_accessors: true,
            include_empty: false,
        }
    }
}

impl CatalogOptions {
    /// Three-key records with no synthesized accessors
    pub fn legacy() -> Self {
        Self {
            extended_records: false,
            synthesize_accessors: false,
            include_empty: false,
        }
    }
}

impl RunConfig {
    pub fn new(framework_name: impl Into<String>, headers_dir: impl Into<PathBuf>) -> Self {
        Self {
            framework_name: framework_name.into(),
            headers_dir: headers_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| crate::Error::config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| crate::Error::parse(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Where the final file goes
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => PathBuf::from(format!(
                "{}.{}",
                self.framework_name,
                self.format.extension()
            )),
        }
    }

    /// Reject configurations that cannot name an output file
    pub fn validate(&self) -> crate::Result<()> {
        let name = self.framework_name.trim();
        if name.is_empty() {
            return Err(crate::Error::config("framework name is empty"));
        }
        if name.contains(['/', '\\']) && self.output.is_none() {
            return Err(crate::Error::config(format!(
                "framework name {:?} contains a path separator",
                name
            )));
        }
        if self.header_extensions.is_empty() {
            return Err(crate::Error::config("no header extensions configured"));
        }
        Ok(())
    }
}
