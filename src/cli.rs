//! Command-line interface and the single-shot analysis pipeline.

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;

use crate::config::OutputConfig;
use crate::loader::{self, SheetSelector};
use crate::{charts, naming, profile, quality, report};

/// Profile one tabular file: data dictionary, quality flags and
/// diagnostic charts, written under the output directory.
#[derive(Debug, Parser)]
#[command(name = "tablescan", version)]
pub struct Cli {
    /// Input table: delimited text or an .xlsx/.xls workbook.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Field delimiter for text input, or "auto" to sniff the first line.
    #[arg(long, default_value = "auto")]
    pub sep: String,

    /// Excel sheet to read, by zero-based index or by name.
    #[arg(long)]
    pub sheet: Option<String>,

    /// Maximum number of histogram panels.
    #[arg(long, default_value_t = 12)]
    pub max_hist: usize,

    /// Maximum number of boxplot panels.
    #[arg(long, default_value_t = 8)]
    pub max_box: usize,

    /// Directory the reports/ and data/ trees are created under.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

pub fn run(cli: &Cli) -> Result<()> {
    let output = OutputConfig::new(&cli.out_dir);
    output.ensure_dirs()?;

    let sheet = cli.sheet.as_deref().map(SheetSelector::from);
    let df = loader::read_table(&cli.input, &cli.sep, sheet.as_ref())?;
    let df = naming::normalize_columns(df)?;

    if df.width() > 0 {
        report::write_sample_head(&df, &output.sample_head())?;
    }

    let overview = profile::data_overview(&df);
    info!(
        "loaded {} rows x {} columns from {}",
        overview.rows,
        overview.cols,
        cli.input.display()
    );
    info!(
        "dtypes {:?}; {} missing cells; ~{} bytes in memory",
        overview.dtype_counts, overview.missing_cells, overview.memory_bytes
    );
    let preview: Vec<&String> = overview.columns.iter().take(5).collect();
    info!("first columns: {preview:?}");

    if overview.cols == 0 {
        error!("no usable columns after header cleanup; skipping the remaining reports");
        return Ok(());
    }

    let dictionary = profile::data_dictionary(&df)?;
    let mut dict_frame = profile::dictionary_frame(&dictionary)?;
    report::write_frame_csv(&mut dict_frame, &output.data_dictionary())?;
    report::write_frame_csv(&mut dict_frame, &output.data_dictionary_debug())?;

    let flags = quality::quality_flags(&df, &dictionary)?;
    report::write_flags_json(&flags, &output.quality_flags())?;
    info!(
        "quality: {} duplicate rows, {} high-missing, {} constant, {} id-like columns",
        flags.duplicate_rows,
        flags.high_missing_cols.len(),
        flags.constant_cols.len(),
        flags.suspected_id_like.len()
    );

    charts::plot_missing_bar(&df, &output.missing_bar())?;
    charts::plot_histograms(&df, &output.histograms(), cli.max_hist)?;
    charts::plot_boxplots(&df, &output.boxplots(), cli.max_box)?;
    match profile::correlation_matrix(&df)? {
        Some(matrix) => charts::plot_correlation(&matrix, &output.corr_matrix())?,
        None => info!("fewer than two numeric columns; skipping correlation heatmap"),
    }

    if let Some(mut summary) = profile::numeric_summary(&df)? {
        report::write_frame_csv(&mut summary, &output.numeric_summary())?;
    }
    report::write_value_counts(&df, &output)?;

    info!("reports written under {}", output.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["tablescan", "--input", "data.csv"]).expect("parse");
        assert_eq!(cli.sep, "auto");
        assert_eq!(cli.sheet, None);
        assert_eq!(cli.max_hist, 12);
        assert_eq!(cli.max_box, 8);
        assert_eq!(cli.out_dir, PathBuf::from("."));
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["tablescan"]).is_err());
    }
}
