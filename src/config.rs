//! Output location configuration.
//!
//! Every stage that touches the filesystem receives an [`OutputConfig`]
//! instead of relying on implicit relative paths, so tests can point the
//! whole pipeline at a scratch directory.

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

/// Resolved output locations for one pipeline run.
///
/// All paths are derived from a single root directory. The layout matches
/// the fixed convention consumers expect:
///
/// ```text
/// <root>/data/interim/sample_head.csv
/// <root>/data/interim/_data_dictionary_debug.csv
/// <root>/reports/data_dictionary.csv
/// <root>/reports/quality_flags.json
/// <root>/reports/numeric_summary.csv
/// <root>/reports/<column>_top20_value_counts.csv
/// <root>/reports/figures/*.png
/// ```
#[derive(Debug, Clone)]
pub struct OutputConfig {
    root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

impl OutputConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the output directory tree. Idempotent.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.reports_dir(), self.figures_dir(), self.interim_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    pub fn figures_dir(&self) -> PathBuf {
        self.reports_dir().join("figures")
    }

    pub fn interim_dir(&self) -> PathBuf {
        self.root.join("data").join("interim")
    }

    pub fn sample_head(&self) -> PathBuf {
        self.interim_dir().join("sample_head.csv")
    }

    pub fn data_dictionary(&self) -> PathBuf {
        self.reports_dir().join("data_dictionary.csv")
    }

    pub fn data_dictionary_debug(&self) -> PathBuf {
        self.interim_dir().join("_data_dictionary_debug.csv")
    }

    pub fn quality_flags(&self) -> PathBuf {
        self.reports_dir().join("quality_flags.json")
    }

    pub fn numeric_summary(&self) -> PathBuf {
        self.reports_dir().join("numeric_summary.csv")
    }

    pub fn value_counts(&self, column: &str) -> PathBuf {
        self.reports_dir()
            .join(format!("{column}_top20_value_counts.csv"))
    }

    pub fn missing_bar(&self) -> PathBuf {
        self.figures_dir().join("missing_bar.png")
    }

    pub fn histograms(&self) -> PathBuf {
        self.figures_dir().join("histograms.png")
    }

    pub fn boxplots(&self) -> PathBuf {
        self.figures_dir().join("boxplots.png")
    }

    pub fn corr_matrix(&self) -> PathBuf {
        self.figures_dir().join("corr_matrix.png")
    }
}

impl AsRef<Path> for OutputConfig {
    fn as_ref(&self) -> &Path {
        &self.root
    }
}
