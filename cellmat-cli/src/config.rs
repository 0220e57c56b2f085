use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

///
/// Settings of the `process` chain.
///
/// Every field is optional in the TOML file and falls back to its default. Command line flags
/// take precedence over the file.
///
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Cells with fewer features present are dropped.
    pub min_features: usize,
    /// Features present in fewer cells are dropped.
    pub min_cells: usize,
    /// Highest fraction of a cell's counts allowed on mitochondrial features.
    pub max_mito: f64,
    pub mito_prefixes: Vec<String>,
    /// Per-cell total after normalization.
    pub norm_count: f64,
    pub log_transform: bool,
    /// Feature type written to sparse bundles.
    pub feature_type: String,
    /// Column header of the mitochondrial percentage report.
    pub mito_report_label: String,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            min_features: 100,
            min_cells: 3,
            max_mito: 0.2,
            mito_prefixes: vec!["MT-".to_string()],
            norm_count: 10000.0,
            log_transform: true,
            feature_type: "Gene Expression".to_string(),
            mito_report_label: "mito_pct".to_string(),
        }
    }
}

impl ProcessConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    pub fn mito_prefixes(&self) -> Vec<&str> {
        self.mito_prefixes.iter().map(String::as_str).collect()
    }
}
