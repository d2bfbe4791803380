//! JSON persistence for datasets, summary records, and validation reports.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::dataset::Dataset;
use crate::error::{DuelError, Result};
use crate::record::SummaryRecord;
use crate::validate::BatchReport;

use super::publish::publish_atomic;

fn save_pretty<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    publish_atomic(path, &bytes)
}

/// Publishes `dataset` as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns a JSON or I/O error.
pub fn save_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    save_pretty(dataset, path)
}

/// Reads a dataset file, re-checking index contiguity and comfort bands.
///
/// # Errors
///
/// Returns `Io` if unreadable, `Json` if malformed or structurally invalid.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let text = fs::read_to_string(path).map_err(|e| DuelError::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}

/// Publishes a sealed summary record.
///
/// # Errors
///
/// Returns a JSON or I/O error.
pub fn save_summary(record: &SummaryRecord, path: &Path) -> Result<()> {
    save_pretty(record, path)
}

/// Publishes a batch validation report.
///
/// # Errors
///
/// Returns a JSON or I/O error.
pub fn save_report(report: &BatchReport, path: &Path) -> Result<()> {
    save_pretty(report, path)
}
