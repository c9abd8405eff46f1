//! Serialization of pipeline results: CSV tables, the quality-flags JSON
//! and the per-column value-counts files.

use anyhow::{Context as _, Result};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::config::OutputConfig;
use crate::profile::is_numeric;
use crate::quality::QualityFlags;

pub fn write_frame_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// First 100 rows, written as-is for a quick manual look.
pub fn write_sample_head(df: &DataFrame, path: &Path) -> Result<()> {
    let mut head = df.head(Some(100));
    write_frame_csv(&mut head, path)
}

pub fn write_flags_json(flags: &QualityFlags, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(flags).context("Failed to serialize quality flags")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Most frequent values of one column, missing included as its own
/// category. Ties break on the value text so output is deterministic.
pub fn value_counts_top(series: &Series, limit: usize) -> Result<Vec<(Option<String>, usize)>> {
    let casted = series
        .cast(&DataType::String)
        .with_context(|| format!("Failed to stringify column '{}'", series.name()))?;
    let ca = casted.str().map_err(|e| anyhow::anyhow!(e))?;

    let mut counts: HashMap<Option<String>, usize> = HashMap::new();
    for value in ca.into_iter() {
        *counts.entry(value.map(str::to_owned)).or_insert(0) += 1;
    }

    let mut entries: Vec<(Option<String>, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(limit);
    Ok(entries)
}

/// One `<column>_top20_value_counts.csv` per non-numeric column. The
/// missing category is written as an empty value field.
pub fn write_value_counts(df: &DataFrame, output: &OutputConfig) -> Result<()> {
    for col in df.get_columns() {
        if is_numeric(col.dtype()) {
            continue;
        }
        let series = col.as_materialized_series();
        let entries = value_counts_top(series, 20)?;

        let path = output.value_counts(col.name());
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer
            .write_record([col.name().as_str(), "count"])
            .context("Failed to write value-counts header")?;
        for (value, count) in entries {
            writer
                .write_record([value.as_deref().unwrap_or(""), &count.to_string()])
                .context("Failed to write value-counts row")?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;
    }
    Ok(())
}
