//! Diagnostic figures rendered to PNG: missingness bar chart, histogram
//! and boxplot grids, and the correlation heatmap.

use anyhow::{anyhow, Result};
use log::info;
use plotters::prelude::*;
use polars::prelude::DataFrame;
use std::path::Path;
use std::sync::Once;

use crate::profile::{numeric_columns, quantile_linear, CorrelationMatrix};

// Embedded so label rendering never depends on system font lookup.
static FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static FONT_INIT: Once = Once::new();

fn ensure_fonts() {
    FONT_INIT.call_once(|| {
        if plotters::style::register_font("sans-serif", FontStyle::Normal, FONT).is_err() {
            log::warn!("could not register embedded font; chart labels may not render");
        }
    });
}

/// Near-square grid for `k` panels: `cols = ceil(sqrt(k))`, rows to fit.
pub fn grid_size(k: usize) -> (usize, usize) {
    if k == 0 {
        return (0, 0);
    }
    let cols = (k as f64).sqrt().ceil() as usize;
    let rows = k.div_ceil(cols);
    (rows, cols)
}

/// Horizontal bar chart of per-column missing percentage, least missing
/// at the bottom.
pub fn plot_missing_bar(df: &DataFrame, path: &Path) -> Result<()> {
    if df.width() == 0 {
        return Ok(());
    }
    ensure_fonts();

    let rows = df.height();
    let mut entries: Vec<(String, f64)> = df
        .get_columns()
        .iter()
        .map(|c| {
            let pct = if rows > 0 {
                c.null_count() as f64 / rows as f64 * 100.0
            } else {
                0.0
            };
            (c.name().to_string(), pct)
        })
        .collect();
    entries.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let n = entries.len();
    let height = (40 * n + 120).max(300) as u32;
    let root = BitMapBackend::new(path, (800, height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow!("Failed to fill missing-values chart: {e}"))?;

    let max_pct = entries.iter().map(|(_, p)| *p).fold(0.0f64, f64::max);
    let mut chart = ChartBuilder::on(&root)
        .caption("Missing values per column (%)", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(160)
        .build_cartesian_2d(0f64..max_pct.max(1.0), (0..n as i32).into_segmented())
        .map_err(|e| anyhow!("Failed to lay out missing-values chart: {e}"))?;

    let names: Vec<String> = entries.iter().map(|(name, _)| name.clone()).collect();
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => names.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .draw()
        .map_err(|e| anyhow!("Failed to draw missing-values mesh: {e}"))?;

    chart
        .draw_series(entries.iter().enumerate().map(|(i, (_, pct))| {
            Rectangle::new(
                [
                    (0.0, SegmentValue::Exact(i as i32)),
                    (*pct, SegmentValue::Exact(i as i32 + 1)),
                ],
                BLUE.mix(0.6).filled(),
            )
        }))
        .map_err(|e| anyhow!("Failed to draw missing-values bars: {e}"))?;

    root.present()
        .map_err(|e| anyhow!("Failed to write {}: {e}", path.display()))?;
    Ok(())
}

/// Grid of 30-bin histograms, one panel per numeric column, capped at
/// `max_cols`. Skipped entirely when no numeric columns exist.
pub fn plot_histograms(df: &DataFrame, path: &Path, max_cols: usize) -> Result<()> {
    let mut numeric = numeric_columns(df)?;
    if numeric.is_empty() {
        info!("no numeric columns; skipping histograms");
        return Ok(());
    }
    numeric.truncate(max_cols);
    ensure_fonts();

    let (rows, cols) = grid_size(numeric.len());
    let root = BitMapBackend::new(path, (400 * cols as u32, 300 * rows as u32))
        .into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow!("Failed to fill histogram canvas: {e}"))?;
    let areas = root.split_evenly((rows, cols));

    for ((name, raw), area) in numeric.iter().zip(areas.iter()) {
        let values: Vec<f64> = raw.iter().flatten().copied().collect();
        if values.is_empty() {
            continue;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (lo, hi) = if min == max {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };

        const BINS: usize = 30;
        let width = (hi - lo) / BINS as f64;
        let mut counts = vec![0u32; BINS];
        for v in &values {
            let idx = (((v - lo) / width) as usize).min(BINS - 1);
            counts[idx] += 1;
        }
        let top = counts.iter().copied().max().unwrap_or(1).max(1);

        let mut chart = ChartBuilder::on(area)
            .caption(name, ("sans-serif", 18))
            .margin(10)
            .x_label_area_size(25)
            .y_label_area_size(35)
            .build_cartesian_2d(lo..hi, 0u32..top + 1)
            .map_err(|e| anyhow!("Failed to lay out histogram for '{name}': {e}"))?;
        chart
            .configure_mesh()
            .draw()
            .map_err(|e| anyhow!("Failed to draw histogram mesh for '{name}': {e}"))?;
        chart
            .draw_series(counts.iter().enumerate().map(|(i, count)| {
                let left = lo + i as f64 * width;
                Rectangle::new([(left, 0), (left + width, *count)], BLUE.mix(0.5).filled())
            }))
            .map_err(|e| anyhow!("Failed to draw histogram bars for '{name}': {e}"))?;
    }

    root.present()
        .map_err(|e| anyhow!("Failed to write {}: {e}", path.display()))?;
    Ok(())
}

/// Grid of boxplots with 1.5*IQR whiskers, capped at `max_cols` numeric
/// columns.
pub fn plot_boxplots(df: &DataFrame, path: &Path, max_cols: usize) -> Result<()> {
    let mut numeric = numeric_columns(df)?;
    if numeric.is_empty() {
        info!("no numeric columns; skipping boxplots");
        return Ok(());
    }
    numeric.truncate(max_cols);
    ensure_fonts();

    let (rows, cols) = grid_size(numeric.len());
    let root = BitMapBackend::new(path, (400 * cols as u32, 300 * rows as u32))
        .into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow!("Failed to fill boxplot canvas: {e}"))?;
    let areas = root.split_evenly((rows, cols));

    for ((name, raw), area) in numeric.iter().zip(areas.iter()) {
        let mut values: Vec<f64> = raw.iter().flatten().copied().collect();
        if values.is_empty() {
            continue;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let q1 = quantile_linear(&values, 0.25).unwrap_or(values[0]);
        let median = quantile_linear(&values, 0.5).unwrap_or(values[0]);
        let q3 = quantile_linear(&values, 0.75).unwrap_or(values[0]);
        let iqr = q3 - q1;
        let lo_fence = q1 - 1.5 * iqr;
        let hi_fence = q3 + 1.5 * iqr;
        let whisker_lo = values
            .iter()
            .copied()
            .find(|v| *v >= lo_fence)
            .unwrap_or(values[0]);
        let whisker_hi = values
            .iter()
            .rev()
            .copied()
            .find(|v| *v <= hi_fence)
            .unwrap_or(values[values.len() - 1]);

        let span = (whisker_hi - whisker_lo).abs().max(1.0);
        let y_lo = whisker_lo - span * 0.1;
        let y_hi = whisker_hi + span * 0.1;

        let mut chart = ChartBuilder::on(area)
            .caption(name, ("sans-serif", 18))
            .margin(10)
            .x_label_area_size(10)
            .y_label_area_size(45)
            .build_cartesian_2d(0f64..2f64, y_lo..y_hi)
            .map_err(|e| anyhow!("Failed to lay out boxplot for '{name}': {e}"))?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(0)
            .draw()
            .map_err(|e| anyhow!("Failed to draw boxplot mesh for '{name}': {e}"))?;

        let box_style = BLUE.mix(0.3).filled();
        let line_style = ShapeStyle::from(&BLACK).stroke_width(1);
        let series: Vec<DynElement<'_, _, (f64, f64)>> = vec![
            PathElement::new(vec![(1.0, whisker_lo), (1.0, q1)], line_style).into_dyn(),
            PathElement::new(vec![(1.0, q3), (1.0, whisker_hi)], line_style).into_dyn(),
            PathElement::new(vec![(0.9, whisker_lo), (1.1, whisker_lo)], line_style).into_dyn(),
            PathElement::new(vec![(0.9, whisker_hi), (1.1, whisker_hi)], line_style).into_dyn(),
            Rectangle::new([(0.7, q1), (1.3, q3)], box_style).into_dyn(),
            Rectangle::new([(0.7, q1), (1.3, q3)], line_style).into_dyn(),
            PathElement::new(vec![(0.7, median), (1.3, median)], line_style).into_dyn(),
        ];
        chart
            .draw_series(series)
            .map_err(|e| anyhow!("Failed to draw boxplot for '{name}': {e}"))?;
    }

    root.present()
        .map_err(|e| anyhow!("Failed to write {}: {e}", path.display()))?;
    Ok(())
}

/// Pearson-correlation heatmap on a fixed [-1, 1] color scale, first
/// column in the top-left corner.
pub fn plot_correlation(matrix: &CorrelationMatrix, path: &Path) -> Result<()> {
    ensure_fonts();
    let n = matrix.columns.len();
    let side = (120 * n as u32 + 200).max(480);
    let root = BitMapBackend::new(path, (side, side)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow!("Failed to fill correlation canvas: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Correlation (Pearson)", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(80)
        .y_label_area_size(120)
        .build_cartesian_2d(
            (0..n as i32).into_segmented(),
            (0..n as i32).into_segmented(),
        )
        .map_err(|e| anyhow!("Failed to lay out correlation chart: {e}"))?;

    let columns = matrix.columns.clone();
    let row_labels = columns.clone();
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => columns.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .y_label_formatter(&|v| match v {
            // Row 0 of the matrix sits at the top of the chart.
            SegmentValue::CenterOf(i) => row_labels
                .get(n - 1 - (*i as usize).min(n - 1))
                .cloned()
                .unwrap_or_default(),
            _ => String::new(),
        })
        .draw()
        .map_err(|e| anyhow!("Failed to draw correlation mesh: {e}"))?;

    chart
        .draw_series(matrix.data.iter().enumerate().flat_map(|(i, row)| {
            let y = (n - 1 - i) as i32;
            row.iter().enumerate().map(move |(j, value)| {
                Rectangle::new(
                    [
                        (SegmentValue::Exact(j as i32), SegmentValue::Exact(y)),
                        (SegmentValue::Exact(j as i32 + 1), SegmentValue::Exact(y + 1)),
                    ],
                    color_for(*value).filled(),
                )
            })
        }))
        .map_err(|e| anyhow!("Failed to draw correlation cells: {e}"))?;

    root.present()
        .map_err(|e| anyhow!("Failed to write {}: {e}", path.display()))?;
    Ok(())
}

/// Diverging blue-white-red scale fixed to [-1, 1].
fn color_for(value: f64) -> RGBColor {
    let v = value.clamp(-1.0, 1.0);
    let lerp = |a: u8, b: u8, t: f64| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    let (low, mid, high) = ((59, 76, 192), (221, 221, 221), (180, 4, 38));
    if v < 0.0 {
        let t = v + 1.0;
        RGBColor(
            lerp(low.0, mid.0, t),
            lerp(low.1, mid.1, t),
            lerp(low.2, mid.2, t),
        )
    } else {
        RGBColor(
            lerp(mid.0, high.0, v),
            lerp(mid.1, high.1, v),
            lerp(mid.2, high.2, v),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::correlation_matrix;
    use polars::prelude::*;

    fn numeric_frame() -> DataFrame {
        let a = Series::new("alpha".into(), vec![1.0, 2.0, 3.0, 4.0, 50.0]);
        let b = Series::new("beta".into(), vec![Some(5.0), None, Some(3.0), Some(2.0), Some(1.0)]);
        let c = Series::new("label".into(), vec!["x", "y", "x", "y", "x"]);
        DataFrame::new(vec![Column::from(a), Column::from(b), Column::from(c)])
            .expect("test frame")
    }

    #[test]
    fn test_grid_size() {
        assert_eq!(grid_size(0), (0, 0));
        assert_eq!(grid_size(1), (1, 1));
        assert_eq!(grid_size(2), (1, 2));
        assert_eq!(grid_size(4), (2, 2));
        assert_eq!(grid_size(7), (3, 3));
        assert_eq!(grid_size(12), (3, 4));
    }

    #[test]
    fn test_color_scale_endpoints() {
        assert_eq!(color_for(-1.0), RGBColor(59, 76, 192));
        assert_eq!(color_for(0.0), RGBColor(221, 221, 221));
        assert_eq!(color_for(1.0), RGBColor(180, 4, 38));
    }

    #[test]
    fn test_render_missing_bar() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("missing_bar.png");
        plot_missing_bar(&numeric_frame(), &path).expect("render");
        assert!(path.metadata().expect("png written").len() > 0);
    }

    #[test]
    fn test_render_histograms_and_boxplots() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let df = numeric_frame();

        let hist = tmp.path().join("histograms.png");
        plot_histograms(&df, &hist, 12).expect("render histograms");
        assert!(hist.metadata().expect("png written").len() > 0);

        let boxes = tmp.path().join("boxplots.png");
        plot_boxplots(&df, &boxes, 8).expect("render boxplots");
        assert!(boxes.metadata().expect("png written").len() > 0);
    }

    #[test]
    fn test_histograms_skipped_without_numeric_columns() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let df = DataFrame::new(vec![Column::from(Series::new("s".into(), vec!["a", "b"]))])
            .expect("test frame");
        let path = tmp.path().join("histograms.png");
        plot_histograms(&df, &path, 12).expect("no-op render");
        assert!(!path.exists());
    }

    #[test]
    fn test_render_correlation() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let matrix = correlation_matrix(&numeric_frame())
            .expect("matrix computed")
            .expect("matrix present");
        let path = tmp.path().join("corr_matrix.png");
        plot_correlation(&matrix, &path).expect("render");
        assert!(path.metadata().expect("png written").len() > 0);
    }
}
