use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ingest::{DEFAULT_DATE_FORMATS, IngestOptions};
use crate::processor::RollupError;

/// Output format for the report bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One CSV file per report
    #[default]
    Csv,
    /// Single JSON document
    Json,
    Both,
}

/// Run configuration, usually read from a TOML file and then overridden by
/// command-line flags.
#[derive(Debug, Clone, Deserialize)]
pub struct RollupConfig {
    /// Directory the reports are written to. Default: "reports".
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub format: ExportFormat,

    /// Rows shown per table in the console summary. Default: 5.
    #[serde(default = "default_top")]
    pub top: usize,

    /// Run the analyses on the rayon pool.
    #[serde(default)]
    pub parallel: bool,

    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub skip_malformed: bool,

    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            skip_malformed: false,
            date_formats: default_date_formats(),
        }
    }
}

impl Default for RollupConfig {
    fn default() -> Self {
        RollupConfig {
            output_dir: default_output_dir(),
            format: ExportFormat::default(),
            top: default_top(),
            parallel: false,
            ingest: IngestConfig::default(),
        }
    }
}

impl RollupConfig {
    pub fn load(path: &Path) -> Result<Self, RollupError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, RollupError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            skip_malformed: self.ingest.skip_malformed,
            date_formats: self.ingest.date_formats.clone(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_top() -> usize {
    5
}

fn default_date_formats() -> Vec<String> {
    DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect()
}
