// src/config/mod.rs

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    env,
    fs::File,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::output::OutputFormat;
use crate::process::pairing::{Realignment, RowTarget};

/// Env var naming a YAML config file to load instead of the defaults.
pub const CONFIG_ENV: &str = "TAXROLL_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "taxroll.yaml";

/// Everything a run needs to know about the document layout and where
/// files live. Loaded once, then shared read-only by every component.
///
/// Keys left out of the YAML keep their defaults; unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// How many columns a page table must have to be processed.
    pub expected_columns: usize,
    /// Character offsets where each column starts in extracted page text.
    /// When unset they are read off the header line.
    pub column_starts: Option<Vec<usize>>,
    /// Output names for identifier columns (old → new).
    pub column_rename: BTreeMap<String, String>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Glob matched against file names inside `input_dir`.
    pub document_pattern: String,
    pub drop_columns: Vec<String>,
    /// Columns that key a property through the wide → long transform.
    pub id_columns: Vec<String>,
    /// Year columns, melted into `year` labels.
    pub year_columns: Vec<String>,
    /// Summary rows at the bottom of a document's final page.
    pub footer_rows: usize,
    pub realignment: Option<Realignment>,
    pub output_format: OutputFormat,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let column_rename = [
            ("Sl No", "s_no"),
            ("New PID", "new_pid_no"),
            ("Old PID", "old_pid_no"),
            ("Khata /Survey", "khata_survey"),
            ("Owner Name", "owner_name"),
            ("Property Address", "address"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let id_columns = [
            "Sl No",
            "New PID",
            "Old PID",
            "Khata /Survey",
            "Owner Name",
            "Property Address",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let year_columns = (2008..2018)
            .map(|y| format!("{}-{}", y, y + 1))
            .collect();

        Self {
            expected_columns: 17,
            column_starts: None,
            column_rename,
            input_dir: PathBuf::from("Input Files"),
            output_dir: PathBuf::from("Output CSVs"),
            document_pattern: "*.pdf".to_string(),
            drop_columns: vec!["Unnamed: 6".to_string()],
            id_columns,
            year_columns,
            footer_rows: 2,
            realignment: Some(Realignment {
                name: "last-row-offset".to_string(),
                target: RowTarget::LastRow,
                shift: 6,
            }),
            output_format: OutputFormat::Csv,
        }
    }
}

impl ParserConfig {
    /// Parse a YAML file; missing keys fall back to the defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        let config: ParserConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// `$TAXROLL_CONFIG`, else `./taxroll.yaml`, else built-in defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            info!(path = %path, "loading config from {}", CONFIG_ENV);
            return Self::from_yaml_file(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            info!(path = %local.display(), "loading config");
            return Self::from_yaml_file(local);
        }
        info!("no config file found, using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.expected_columns == 0 {
            bail!("expected_columns must be greater than zero");
        }
        if self.id_columns.is_empty() {
            bail!("id_columns must not be empty");
        }
        if self.year_columns.is_empty() {
            bail!("year_columns must not be empty");
        }
        if let Some(starts) = &self.column_starts {
            if starts.len() != self.expected_columns {
                bail!(
                    "column_starts has {} entries but expected_columns is {}",
                    starts.len(),
                    self.expected_columns
                );
            }
            if starts.windows(2).any(|w| w[0] >= w[1]) {
                bail!("column_starts must be strictly increasing");
            }
        }
        if self.document_pattern.trim().is_empty() {
            bail!("document_pattern must not be empty");
        }
        Ok(())
    }
}
