//! Format-tolerant loading of one tabular file into a `DataFrame`.
//!
//! Two entry formats are supported: delimited text (via the `csv` crate,
//! with optional delimiter sniffing) and Excel workbooks (via `calamine`,
//! with a short header-row search). Both paths funnel through the same
//! column builder, which decides each column's dtype exactly once:
//! Float64 when every present value parses as a number, Boolean when every
//! present value is a true/false literal, String otherwise. Downstream
//! stages dispatch on the dtype and never re-infer.

use anyhow::{anyhow, bail, Context as _, Result};
use calamine::{Data, DataType as _, Reader as _};
use polars::prelude::*;
use std::io::BufRead as _;
use std::path::Path;

use crate::naming::UNNAMED_PREFIX;

/// Delimiters considered by [`detect_delimiter`], in tie-break order.
pub const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// Cell spellings treated as missing on ingestion. Matches the pandas
/// defaults where they overlap; bare lowercase "na" stays a real value.
const MISSING_MARKERS: [&str; 9] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None",
];

/// Excel sheet selector: numeric strings select by position, anything
/// else by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl From<&str> for SheetSelector {
    fn from(raw: &str) -> Self {
        raw.parse::<usize>()
            .map(Self::Index)
            .unwrap_or_else(|_| Self::Name(raw.to_owned()))
    }
}

/// Picks the candidate with the highest raw occurrence count in the first
/// line. Ties go to the earlier candidate, so an empty line yields `,`.
pub fn detect_delimiter(first_line: &str) -> char {
    let mut best = ',';
    let mut best_count = -1i64;
    for candidate in DELIMITER_CANDIDATES {
        let count = first_line.matches(candidate).count() as i64;
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Reads an Excel or delimited-text file into a typed `DataFrame`.
///
/// `sep` is either `"auto"` or an explicit delimiter; it is ignored for
/// Excel input. `sheet` is ignored for delimited input.
pub fn read_table(path: &Path, sep: &str, sheet: Option<&SheetSelector>) -> Result<DataFrame> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "xlsx" | "xls" => read_excel(path, sheet),
        _ => read_delimited(path, sep),
    }
}

fn parse_delimiter(arg: &str) -> Result<char> {
    // "\t" survives shell quoting as a two-character string.
    if arg == "\\t" || arg == "tab" {
        return Ok('\t');
    }
    let mut chars = arg.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c),
        _ => bail!("Invalid delimiter {arg:?}: expected a single ASCII character or \"auto\""),
    }
}

fn read_delimited(path: &Path, sep: &str) -> Result<DataFrame> {
    let sep = if sep == "auto" {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open input file {}", path.display()))?;
        let mut first_line = String::new();
        std::io::BufReader::new(file)
            .read_line(&mut first_line)
            .with_context(|| format!("Failed to read first line of {}", path.display()))?;
        detect_delimiter(&first_line)
    } else {
        parse_delimiter(sep)?
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sep as u8)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;

    let names: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header row")?
        .iter()
        .enumerate()
        .map(|(i, h)| header_name(h, i))
        .collect();

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for (row_idx, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Failed to parse CSV row {}", row_idx + 1))?;
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(normalize_cell(record.get(i)));
        }
    }

    build_frame(&names, cells)
}

fn read_excel(path: &Path, sheet: Option<&SheetSelector>) -> Result<DataFrame> {
    let mut workbook = calamine::open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;

    let range = match sheet {
        Some(SheetSelector::Index(i)) => workbook
            .worksheet_range_at(*i)
            .ok_or_else(|| anyhow!("Sheet index {i} is out of range"))?
            .map_err(|e| anyhow!("Failed to read sheet {i} of {}: {e}", path.display()))?,
        Some(SheetSelector::Name(name)) => workbook
            .worksheet_range(name)
            .map_err(|e| anyhow!("Failed to read sheet {name:?} of {}: {e}", path.display()))?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| anyhow!("Workbook has no sheets"))?
            .map_err(|e| anyhow!("Failed to read first sheet of {}: {e}", path.display()))?,
    };

    let rows: Vec<Vec<Option<String>>> = range
        .rows()
        .map(|row| row.iter().map(excel_cell).collect())
        .collect();

    frame_from_rows(rows)
}

fn excel_cell(cell: &Data) -> Option<String> {
    if cell.is_empty() {
        return None;
    }
    let value = cell.as_string().unwrap_or_else(|| cell.to_string());
    normalize_cell(Some(&value))
}

/// Builds a frame from spreadsheet rows, trying header rows 0, 1 and 2 and
/// keeping the first attempt that yields at least one column. When no row
/// can serve as a header the data is parsed headerless with positional
/// column names.
pub(crate) fn frame_from_rows(rows: Vec<Vec<Option<String>>>) -> Result<DataFrame> {
    for header_row in 0..3 {
        if let Some(df) = frame_with_header(&rows, header_row)? {
            return Ok(df);
        }
    }

    // Headerless fallback.
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let names: Vec<String> = (0..width).map(|i| i.to_string()).collect();
    build_frame(&names, transpose(&rows, width))
}

fn frame_with_header(
    rows: &[Vec<Option<String>>],
    header_row: usize,
) -> Result<Option<DataFrame>> {
    let Some(header) = rows.get(header_row) else {
        return Ok(None);
    };
    if header.is_empty() {
        return Ok(None);
    }

    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| header_name(cell.as_deref().unwrap_or(""), i))
        .collect();
    let data = rows.get(header_row + 1..).unwrap_or(&[]);
    Some(build_frame(&names, transpose(data, names.len()))).transpose()
}

fn header_name(raw: &str, index: usize) -> String {
    if raw.trim().is_empty() {
        format!("{UNNAMED_PREFIX}: {index}")
    } else {
        raw.to_owned()
    }
}

fn transpose(rows: &[Vec<Option<String>>], width: usize) -> Vec<Vec<Option<String>>> {
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); width];
    for row in rows {
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(row.get(i).cloned().flatten());
        }
    }
    cells
}

fn normalize_cell(value: Option<&str>) -> Option<String> {
    match value {
        None => None,
        Some(v) if MISSING_MARKERS.contains(&v) => None,
        Some(v) => Some(v.to_owned()),
    }
}

/// Assembles typed columns from column-major string cells.
pub(crate) fn build_frame(names: &[String], cells: Vec<Vec<Option<String>>>) -> Result<DataFrame> {
    let columns: Vec<Column> = names
        .iter()
        .zip(cells)
        .map(|(name, values)| infer_column(name, values))
        .collect();
    DataFrame::new(columns).context("Failed to assemble table from parsed columns")
}

/// Decides a column's dtype once, from its raw cell values.
fn infer_column(name: &str, raw: Vec<Option<String>>) -> Column {
    let present: Vec<&str> = raw.iter().flatten().map(|s| s.as_str()).collect();

    // All-missing columns become Float64 so missing-heavy numeric data
    // keeps a numeric dtype.
    if present.iter().all(|v| v.trim().parse::<f64>().is_ok()) {
        let values: Vec<Option<f64>> = raw
            .iter()
            .map(|v| v.as_ref().and_then(|s| s.trim().parse().ok()))
            .collect();
        return Column::from(Series::new(name.into(), values));
    }

    if !present.is_empty()
        && present
            .iter()
            .all(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "false"))
    {
        let values: Vec<Option<bool>> = raw
            .iter()
            .map(|v| v.as_ref().map(|s| s.trim().eq_ignore_ascii_case("true")))
            .collect();
        return Column::from(Series::new(name.into(), values));
    }

    Column::from(Series::new(name.into(), raw))
}
