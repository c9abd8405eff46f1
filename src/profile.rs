//! Descriptive statistics over a loaded table: the overview, the
//! per-column data dictionary, the numeric summary and the correlation
//! matrix. Everything here is a pure function of the `DataFrame`.

use anyhow::{Context as _, Result};
use polars::prelude::*;
use std::collections::BTreeMap;

/// Top-level shape summary of a table. Computed once, only logged.
#[derive(Debug, Clone)]
pub struct Overview {
    pub rows: usize,
    pub cols: usize,
    pub columns: Vec<String>,
    pub dtype_counts: BTreeMap<String, usize>,
    pub missing_cells: usize,
    pub memory_bytes: usize,
}

/// One data-dictionary record. `min`/`max`/`mean` are populated for
/// numeric columns only.
#[derive(Debug, Clone)]
pub struct DictionaryEntry {
    pub column: String,
    pub dtype: String,
    pub non_null: usize,
    pub nunique: usize,
    pub missing: usize,
    pub missing_pct: f64,
    pub sample: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub data: Vec<Vec<f64>>,
}

/// Columns carry their load-time dtype; numeric means Float64 here.
pub fn is_numeric(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float64)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn data_overview(df: &DataFrame) -> Overview {
    let mut dtype_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut missing_cells = 0;
    for col in df.get_columns() {
        *dtype_counts.entry(col.dtype().to_string()).or_insert(0) += 1;
        missing_cells += col.null_count();
    }

    Overview {
        rows: df.height(),
        cols: df.width(),
        columns: df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        dtype_counts,
        missing_cells,
        memory_bytes: df.estimated_size(),
    }
}

pub fn data_dictionary(df: &DataFrame) -> Result<Vec<DictionaryEntry>> {
    let rows = df.height();
    let mut entries = Vec::with_capacity(df.width());

    for col in df.get_columns() {
        let name = col.name().to_string();
        let series = col.as_materialized_series();
        let missing = series.null_count();
        let non_null = rows - missing;
        let nunique = series
            .drop_nulls()
            .n_unique()
            .with_context(|| format!("Failed to count unique values in '{name}'"))?;
        let missing_pct = if rows > 0 {
            round2(missing as f64 / rows as f64 * 100.0)
        } else {
            0.0
        };
        let sample = sample_values(series, 3)?.join(" | ");

        let (min, max, mean) = if is_numeric(series.dtype()) {
            let ca = series
                .f64()
                .with_context(|| format!("Numeric column '{name}' was not Float64"))?;
            (ca.min(), ca.max(), ca.mean())
        } else {
            (None, None, None)
        };

        entries.push(DictionaryEntry {
            column: name,
            dtype: series.dtype().to_string(),
            non_null,
            nunique,
            missing,
            missing_pct,
            sample,
            min,
            max,
            mean,
        });
    }
    Ok(entries)
}

/// First `n` non-null values in table order, stringified.
fn sample_values(series: &Series, n: usize) -> Result<Vec<String>> {
    let head = series.drop_nulls().head(Some(n));
    let casted = head
        .cast(&DataType::String)
        .with_context(|| format!("Failed to stringify samples of '{}'", series.name()))?;
    Ok(casted
        .str()
        .map_err(|e| anyhow::anyhow!(e))?
        .into_iter()
        .flatten()
        .map(|s| s.to_owned())
        .collect())
}

/// Data-dictionary entries as a writable frame, one row per column.
pub fn dictionary_frame(entries: &[DictionaryEntry]) -> Result<DataFrame> {
    let columns = vec![
        Column::from(Series::new(
            "column".into(),
            entries.iter().map(|e| e.column.clone()).collect::<Vec<_>>(),
        )),
        Column::from(Series::new(
            "dtype".into(),
            entries.iter().map(|e| e.dtype.clone()).collect::<Vec<_>>(),
        )),
        Column::from(Series::new(
            "non_null".into(),
            entries.iter().map(|e| e.non_null as i64).collect::<Vec<_>>(),
        )),
        Column::from(Series::new(
            "nunique".into(),
            entries.iter().map(|e| e.nunique as i64).collect::<Vec<_>>(),
        )),
        Column::from(Series::new(
            "missing".into(),
            entries.iter().map(|e| e.missing as i64).collect::<Vec<_>>(),
        )),
        Column::from(Series::new(
            "missing_pct".into(),
            entries.iter().map(|e| e.missing_pct).collect::<Vec<_>>(),
        )),
        Column::from(Series::new(
            "sample".into(),
            entries.iter().map(|e| e.sample.clone()).collect::<Vec<_>>(),
        )),
        Column::from(Series::new(
            "min".into(),
            entries.iter().map(|e| e.min).collect::<Vec<_>>(),
        )),
        Column::from(Series::new(
            "max".into(),
            entries.iter().map(|e| e.max).collect::<Vec<_>>(),
        )),
        Column::from(Series::new(
            "mean".into(),
            entries.iter().map(|e| e.mean).collect::<Vec<_>>(),
        )),
    ];
    DataFrame::new(columns).context("Failed to build data-dictionary frame")
}

/// Numeric columns with their values in row order, nulls preserved.
pub fn numeric_columns(df: &DataFrame) -> Result<Vec<(String, Vec<Option<f64>>)>> {
    let mut out = Vec::new();
    for col in df.get_columns() {
        if !is_numeric(col.dtype()) {
            continue;
        }
        let ca = col
            .as_materialized_series()
            .f64()
            .map_err(|e| anyhow::anyhow!(e))?;
        out.push((col.name().to_string(), ca.into_iter().collect()));
    }
    Ok(out)
}

/// Linear-interpolation quantile over an ascending-sorted slice.
pub(crate) fn quantile_linear(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let lo_val = *sorted.get(lo)?;
    let hi_val = *sorted.get(hi)?;
    Some(lo_val + (hi_val - lo_val) * (pos - lo as f64))
}

/// Standard descriptive statistics for the numeric columns: one statistic
/// per row, one column per variable. `None` when the table has no numeric
/// columns.
pub fn numeric_summary(df: &DataFrame) -> Result<Option<DataFrame>> {
    let numeric = numeric_columns(df)?;
    if numeric.is_empty() {
        return Ok(None);
    }

    const STATS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
    let mut columns = vec![Column::from(Series::new(
        "statistic".into(),
        STATS.iter().map(|s| (*s).to_owned()).collect::<Vec<_>>(),
    ))];

    for (name, values) in &numeric {
        let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let ca = df
            .column(name)?
            .as_materialized_series()
            .f64()
            .map_err(|e| anyhow::anyhow!(e))?;
        let stats: Vec<Option<f64>> = vec![
            Some(sorted.len() as f64),
            ca.mean(),
            ca.std(1),
            sorted.first().copied(),
            quantile_linear(&sorted, 0.25),
            quantile_linear(&sorted, 0.5),
            quantile_linear(&sorted, 0.75),
            sorted.last().copied(),
        ];
        columns.push(Column::from(Series::new(name.as_str().into(), stats)));
    }

    DataFrame::new(columns)
        .map(Some)
        .context("Failed to build numeric summary frame")
}

/// Pairwise Pearson correlation over pairwise-complete observations.
/// `None` when fewer than two numeric columns exist.
pub fn correlation_matrix(df: &DataFrame) -> Result<Option<CorrelationMatrix>> {
    let numeric = numeric_columns(df)?;
    if numeric.len() < 2 {
        return Ok(None);
    }

    let mut data = Vec::with_capacity(numeric.len());
    for (i, (_, x)) in numeric.iter().enumerate() {
        let mut row = Vec::with_capacity(numeric.len());
        for (j, (_, y)) in numeric.iter().enumerate() {
            if i == j {
                row.push(1.0);
            } else {
                row.push(pearson(x, y).unwrap_or(0.0));
            }
        }
        data.push(row);
    }

    Ok(Some(CorrelationMatrix {
        columns: numeric.into_iter().map(|(name, _)| name).collect(),
        data,
    }))
}

fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        let age = Series::new("age".into(), vec![Some(30.0), Some(40.0), None, Some(50.0)]);
        let city = Series::new(
            "city".into(),
            vec![Some("Cali"), Some("Cali"), Some("Bogota"), None],
        );
        DataFrame::new(vec![Column::from(age), Column::from(city)]).expect("test frame")
    }

    #[test]
    fn test_overview_matches_shape() {
        let df = sample_frame();
        let overview = data_overview(&df);
        assert_eq!(overview.rows, df.height());
        assert_eq!(overview.cols, df.width());
        assert_eq!(overview.columns, vec!["age", "city"]);
        assert_eq!(overview.missing_cells, 2);
        assert!(overview.memory_bytes > 0);
    }

    #[test]
    fn test_dictionary_entries() -> Result<()> {
        let entries = data_dictionary(&sample_frame())?;
        assert_eq!(entries.len(), 2);

        let age = &entries[0];
        assert_eq!(age.non_null, 3);
        assert_eq!(age.nunique, 3);
        assert_eq!(age.missing, 1);
        assert_eq!(age.missing_pct, 25.0);
        assert_eq!(age.min, Some(30.0));
        assert_eq!(age.max, Some(50.0));
        assert_eq!(age.mean, Some(40.0));
        // Three non-null values joined with the separator.
        assert_eq!(age.sample.matches(" | ").count(), 2);

        let city = &entries[1];
        assert_eq!(city.nunique, 2);
        assert_eq!(city.min, None);
        assert_eq!(city.sample, "Cali | Cali | Bogota");
        Ok(())
    }

    #[test]
    fn test_missing_pct_bounds_and_empty_table() -> Result<()> {
        let empty = Series::new("x".into(), Vec::<Option<f64>>::new());
        let df = DataFrame::new(vec![Column::from(empty)])?;
        let entries = data_dictionary(&df)?;
        assert_eq!(entries[0].missing_pct, 0.0);

        for entry in data_dictionary(&sample_frame())? {
            assert!((0.0..=100.0).contains(&entry.missing_pct));
        }
        Ok(())
    }

    #[test]
    fn test_missing_pct_rounding() -> Result<()> {
        // 1 missing out of 3 rows: 33.333...% rounds to 33.33.
        let s = Series::new("x".into(), vec![Some(1.0), Some(2.0), None]);
        let df = DataFrame::new(vec![Column::from(s)])?;
        let entries = data_dictionary(&df)?;
        assert_eq!(entries[0].missing_pct, 33.33);
        Ok(())
    }

    #[test]
    fn test_quantile_linear() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_linear(&values, 0.0), Some(1.0));
        assert_eq!(quantile_linear(&values, 0.5), Some(2.5));
        assert_eq!(quantile_linear(&values, 0.25), Some(1.75));
        assert_eq!(quantile_linear(&values, 1.0), Some(4.0));
        assert_eq!(quantile_linear(&[], 0.5), None);
    }

    #[test]
    fn test_numeric_summary_values() -> Result<()> {
        let s = Series::new("v".into(), vec![1.0, 2.0, 3.0, 4.0]);
        let df = DataFrame::new(vec![Column::from(s)])?;
        let summary = numeric_summary(&df)?.expect("numeric summary present");
        assert_eq!(summary.height(), 8);

        let v = summary.column("v")?.as_materialized_series().clone();
        let v = v.f64().map_err(|e| anyhow::anyhow!(e))?;
        assert_eq!(v.get(0), Some(4.0)); // count
        assert_eq!(v.get(1), Some(2.5)); // mean
        assert_eq!(v.get(3), Some(1.0)); // min
        assert_eq!(v.get(4), Some(1.75)); // 25%
        assert_eq!(v.get(7), Some(4.0)); // max
        Ok(())
    }

    #[test]
    fn test_numeric_summary_absent_without_numeric_columns() -> Result<()> {
        let s = Series::new("name".into(), vec!["a", "b"]);
        let df = DataFrame::new(vec![Column::from(s)])?;
        assert!(numeric_summary(&df)?.is_none());
        Ok(())
    }

    #[test]
    fn test_correlation_matrix() -> Result<()> {
        let a = Series::new("a".into(), vec![1.0, 2.0, 3.0]);
        let b = Series::new("b".into(), vec![2.0, 4.0, 6.0]);
        let c = Series::new("c".into(), vec![3.0, 2.0, 1.0]);
        let d = Series::new("d".into(), vec!["x", "y", "z"]);
        let df = DataFrame::new(vec![
            Column::from(a),
            Column::from(b),
            Column::from(c),
            Column::from(d),
        ])?;

        let matrix = correlation_matrix(&df)?.expect("matrix present");
        assert_eq!(matrix.columns, vec!["a", "b", "c"]);
        assert!((matrix.data[0][1] - 1.0).abs() < 1e-9);
        assert!((matrix.data[0][2] + 1.0).abs() < 1e-9);
        assert_eq!(matrix.data[1][1], 1.0);
        Ok(())
    }

    #[test]
    fn test_correlation_requires_two_numeric_columns() -> Result<()> {
        let a = Series::new("a".into(), vec![1.0, 2.0, 3.0]);
        let d = Series::new("d".into(), vec!["x", "y", "z"]);
        let df = DataFrame::new(vec![Column::from(a), Column::from(d)])?;
        assert!(correlation_matrix(&df)?.is_none());
        Ok(())
    }

    #[test]
    fn test_correlation_uses_pairwise_complete_rows() -> Result<()> {
        let a = Series::new("a".into(), vec![Some(1.0), Some(2.0), None, Some(4.0)]);
        let b = Series::new("b".into(), vec![Some(2.0), Some(4.0), Some(9.0), Some(8.0)]);
        let df = DataFrame::new(vec![Column::from(a), Column::from(b)])?;
        let matrix = correlation_matrix(&df)?.expect("matrix present");
        // The row where `a` is null is excluded, leaving a perfect fit.
        assert!((matrix.data[0][1] - 1.0).abs() < 1e-9);
        Ok(())
    }
}
