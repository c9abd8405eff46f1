//! Heuristic quality checks layered on top of the data dictionary.

use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;

use crate::profile::DictionaryEntry;

/// A column missing more than this share of its values gets flagged.
pub const HIGH_MISSING_PCT: f64 = 30.0;

/// Share of rows that must be distinct before a column looks like an
/// identifier.
pub const ID_UNIQUE_RATIO: f64 = 0.9;

/// Quality findings for one table. Field order is the serialized key
/// order in `quality_flags.json`.
#[derive(Debug, Clone, Serialize)]
pub struct QualityFlags {
    pub rows: usize,
    pub high_missing_cols: Vec<String>,
    pub constant_cols: Vec<String>,
    pub suspected_id_like: Vec<String>,
    pub duplicate_rows: usize,
}

pub fn quality_flags(df: &DataFrame, dictionary: &[DictionaryEntry]) -> Result<QualityFlags> {
    let rows = df.height();
    let mut high_missing_cols = Vec::new();
    let mut constant_cols = Vec::new();
    let mut suspected_id_like = Vec::new();

    let id_threshold = ((ID_UNIQUE_RATIO * rows as f64).ceil() as usize).max(2);
    for entry in dictionary {
        if entry.missing_pct > HIGH_MISSING_PCT {
            high_missing_cols.push(entry.column.clone());
        }
        if entry.nunique <= 1 {
            constant_cols.push(entry.column.clone());
        }
        // The identifier heuristic is meaningless without rows.
        if rows > 0 && entry.nunique >= id_threshold {
            suspected_id_like.push(entry.column.clone());
        }
    }

    Ok(QualityFlags {
        rows,
        high_missing_cols,
        constant_cols,
        suspected_id_like,
        duplicate_rows: count_duplicate_rows(df)?,
    })
}

/// Counts rows that repeat an earlier row exactly; the first occurrence
/// is not counted. Comparison happens on stringified cells, with nulls
/// treated as equal to each other.
fn count_duplicate_rows(df: &DataFrame) -> Result<usize> {
    if df.height() == 0 || df.width() == 0 {
        return Ok(0);
    }

    let mut cells: Vec<Vec<Option<String>>> = Vec::with_capacity(df.width());
    for col in df.get_columns() {
        let casted = col
            .as_materialized_series()
            .cast(&DataType::String)
            .map_err(|e| anyhow::anyhow!(e))?;
        let ca = casted.str().map_err(|e| anyhow::anyhow!(e))?;
        cells.push(ca.into_iter().map(|v| v.map(str::to_owned)).collect());
    }

    let mut seen = HashSet::with_capacity(df.height());
    let mut duplicates = 0;
    for row in 0..df.height() {
        let key: Vec<&str> = cells
            .iter()
            .map(|col| col[row].as_deref().unwrap_or("\u{0}null"))
            .collect();
        if !seen.insert(key.join("\u{1f}")) {
            duplicates += 1;
        }
    }
    Ok(duplicates)
}
