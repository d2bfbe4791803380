//! CSV export for simulation traces and leaderboards.

use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::leaderboard::RankedTable;
use crate::sim::types::SimulationTrace;

use super::publish::publish_atomic;

/// Trace CSV column header.
pub const TRACE_HEADER: [&str; 5] = [
    "hour_index",
    "baseline_demand_kw",
    "adjustment_kw",
    "actual_draw_kw",
    "violation",
];

/// Leaderboard CSV column header.
pub const LEADERBOARD_HEADER: [&str; 8] = [
    "rank",
    "strategy_id",
    "average_grid_draw_kw",
    "comfort_violations",
    "seed",
    "simulation_duration_hours",
    "timestamp",
    "integrity_hash",
];

/// Writes one row per hour of `trace` to any writer.
///
/// Floats use Rust's shortest round-trip formatting, so the file reproduces
/// the trace exactly.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_trace_csv(trace: &SimulationTrace, writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(TRACE_HEADER)?;
    for e in trace.entries() {
        wtr.write_record(&[
            e.hour_index.to_string(),
            e.baseline_demand_kw.to_string(),
            e.adjustment_kw.to_string(),
            e.actual_draw_kw.to_string(),
            e.violation.to_string(),
        ])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes the ranked entries of `table` to any writer.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_leaderboard_csv(table: &RankedTable, writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(LEADERBOARD_HEADER)?;
    for e in &table.entries {
        let r = &e.record;
        wtr.write_record(&[
            e.rank.to_string(),
            r.strategy_id.clone(),
            r.average_grid_draw_kw.to_string(),
            r.comfort_violations.to_string(),
            r.seed.to_string(),
            r.simulation_duration_hours.to_string(),
            r.timestamp.clone(),
            r.integrity_hash.clone(),
        ])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Publishes the trace CSV at `path`.
///
/// # Errors
///
/// Returns a CSV or I/O error.
pub fn export_trace(trace: &SimulationTrace, path: &Path) -> Result<()> {
    let mut buf = Vec::new();
    write_trace_csv(trace, &mut buf)?;
    publish_atomic(path, &buf)
}

/// Publishes the leaderboard CSV at `path`.
///
/// # Errors
///
/// Returns a CSV or I/O error.
pub fn export_leaderboard(table: &RankedTable, path: &Path) -> Result<()> {
    let mut buf = Vec::new();
    write_leaderboard_csv(table, &mut buf)?;
    publish_atomic(path, &buf)
}
