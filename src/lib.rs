#![warn(clippy::all, rust_2018_idioms)]

//! Single-shot exploratory analysis for one tabular dataset.
//!
//! Point [`cli::run`] at a delimited-text file or Excel workbook and it
//! writes a sample head, a data dictionary, quality flags, a numeric
//! summary, per-column value counts and a set of diagnostic PNGs under
//! the configured output directory.

pub mod charts;
pub mod cli;
pub mod config;
pub mod loader;
pub mod naming;
pub mod profile;
pub mod quality;
pub mod report;
