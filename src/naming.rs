//! Column-name normalization applied once, right after load.
//!
//! Mirrors what a spreadsheet export tends to need: placeholder columns
//! produced by blank header cells (`Unnamed: 0`, `Unnamed: 1`, ...) are
//! dropped, names are trimmed and de-spaced, and collisions are suffixed
//! so the resulting names are unique.

use anyhow::{Context as _, Result};
use log::warn;
use polars::prelude::*;

/// Placeholder prefix assigned to blank header cells at load time.
pub const UNNAMED_PREFIX: &str = "Unnamed";

pub fn is_unnamed(name: &str) -> bool {
    name.starts_with(UNNAMED_PREFIX)
}

/// Trim surrounding whitespace and replace inner spaces with underscores.
pub fn clean_name(name: &str) -> String {
    name.trim().replace(' ', "_")
}

/// Deduplicate cleaned names by suffixing `_1`, `_2`, ... to collisions.
pub fn dedup_names(names: &[String]) -> Vec<String> {
    let mut cleaned = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for name in names {
        let base = clean_name(name);
        let mut candidate = base.clone();
        let mut count = 0;
        while seen.contains(&candidate) {
            count += 1;
            candidate = format!("{base}_{count}");
        }
        seen.insert(candidate.clone());
        cleaned.push(candidate);
    }
    cleaned
}

/// Drops `Unnamed` placeholder columns and rewrites the remaining names.
///
/// When *every* column is a placeholder the table is left intact apart
/// from the rename pass: stripping them all would leave nothing to
/// analyse, so we warn and carry on with what the header gave us.
pub fn normalize_columns(df: DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let all_unnamed = !names.is_empty() && names.iter().all(|n| is_unnamed(n));
    if all_unnamed {
        warn!("every column is '{UNNAMED_PREFIX}'; check the header row, keeping columns as-is");
    }

    let kept: Vec<&Column> = df
        .get_columns()
        .iter()
        .filter(|c| all_unnamed || !is_unnamed(c.name()))
        .collect();
    let kept_names: Vec<String> = kept.iter().map(|c| c.name().to_string()).collect();
    let new_names = dedup_names(&kept_names);

    let columns: Vec<Column> = kept
        .iter()
        .zip(new_names)
        .map(|(c, name)| {
            Column::from(
                c.as_materialized_series()
                    .clone()
                    .with_name(name.as_str().into()),
            )
        })
        .collect();
    DataFrame::new(columns).context("Failed to rebuild table with normalized column names")
}
