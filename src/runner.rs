//! Operations behind each CLI subcommand.
//!
//! Each function does the work and returns data; printing and exit codes are
//! left to the binary.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::cli::{AggregateArgs, GenerateArgs, SimulateArgs, ValidateArgs};
use crate::config::ScenarioConfig;
use crate::dataset::{Dataset, generate_with, verify_reproducible};
use crate::error::{DuelError, Result};
use crate::io::{
    export_leaderboard, export_trace, load_dataset, save_dataset, save_report, save_summary,
};
use crate::leaderboard::{RankedTable, aggregate};
use crate::policy::Policy;
use crate::sim::{RunOutput, RunReport, SimConfig, run};
use crate::timestamp::Timestamp;
use crate::validate::{BatchReport, Schema, ValidationIssue, load_summary, validate_batch};

/// Loads the scenario at `path`, or the baseline preset when `None`, and
/// validates it.
///
/// # Errors
///
/// Returns `ConfigurationError` if the file cannot be parsed and
/// `InvalidScenario` listing every bad field otherwise.
pub fn load_scenario(path: Option<&Path>) -> Result<ScenarioConfig> {
    let scenario = match path {
        Some(path) => ScenarioConfig::from_toml_file(path)?,
        None => ScenarioConfig::baseline(),
    };
    let errors = scenario.validate();
    if !errors.is_empty() {
        return Err(DuelError::InvalidScenario(errors));
    }
    Ok(scenario)
}

/// `generate-dataset`: builds the scenario and publishes it to `args.out`.
///
/// # Errors
///
/// Returns configuration, JSON, or I/O errors.
pub fn generate_dataset(args: &GenerateArgs) -> Result<Dataset> {
    let scenario = load_scenario(args.config.as_deref())?;
    let dataset = generate_with(&scenario.generator, args.seed, args.hours)?;
    save_dataset(&dataset, &args.out)?;
    info!(path = %args.out.display(), hours = dataset.len(), "dataset written");
    Ok(dataset)
}

/// Result of `run-simulation`.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub output: RunOutput,
    pub report: RunReport,
}

/// `run-simulation`: runs one policy over a dataset file and publishes the
/// trace CSV and sealed summary.
///
/// The dataset is regenerated from `args.seed` (or the scenario seed when no
/// seed is given) and must match exactly, so the seed sealed into the summary
/// is always one the dataset was verified against. Nothing is written if the
/// run fails.
///
/// # Errors
///
/// Returns configuration, determinism, causality, JSON, CSV, or I/O errors.
pub fn run_simulation(args: &SimulateArgs) -> Result<SimulationOutcome> {
    let scenario = load_scenario(args.config.as_deref())?;
    let dataset = load_dataset(&args.dataset)?;

    let seed = args.seed.unwrap_or(scenario.simulation.seed);
    if args.seed.is_none() {
        info!(seed, "no --seed given; checking dataset against the scenario seed");
    }
    verify_reproducible(&scenario.generator, seed, &dataset)?;

    let policy = Policy::from_id(&args.policy, &scenario)?;
    let mut config = SimConfig::from_scenario(&scenario);
    config.seed = seed;
    config.hours = dataset.len();
    if let Some(text) = &args.timestamp {
        let ts = Timestamp::parse(text).map_err(|e| DuelError::config("timestamp", e.to_string()))?;
        config = config.with_timestamp(ts);
    }

    let output = run(config, &dataset, policy)?;
    let report = RunReport::from_trace(&output.trace, &dataset);

    export_trace(&output.trace, &args.trace_out)?;
    save_summary(&output.summary, &args.summary_out)?;
    info!(
        trace = %args.trace_out.display(),
        summary = %args.summary_out.display(),
        "run published"
    );
    Ok(SimulationOutcome { output, report })
}

/// `validate`: checks every file against the named or loaded schema and
/// optionally publishes the report as JSON.
///
/// # Errors
///
/// Returns an error if the schema cannot be loaded or the report cannot be
/// written; per-file findings are in the report.
pub fn validate_files(args: &ValidateArgs) -> Result<BatchReport> {
    let schema = Schema::resolve(&args.schema)?;
    let report = validate_batch(&args.files, &schema);
    if let Some(out) = &args.report {
        save_report(&report, out)?;
        info!(path = %out.display(), "validation report written");
    }
    Ok(report)
}

/// A summary file that did not verify.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedFile {
    pub path: PathBuf,
    pub issues: Vec<ValidationIssue>,
}

/// Result of `aggregate`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub table: RankedTable,
    pub rejected: Vec<RejectedFile>,
}

/// Verifies every summary file and ranks the ones that pass.
///
/// Rejected files are reported, never ranked.
pub fn aggregate_files(files: &[PathBuf]) -> Aggregation {
    let loaded: Vec<(PathBuf, _)> = files
        .par_iter()
        .map(|path| (path.clone(), load_summary(path)))
        .collect();

    let mut verified = Vec::with_capacity(loaded.len());
    let mut rejected = Vec::new();
    for (path, result) in loaded {
        match result {
            Ok(record) => verified.push(record),
            Err(issues) => {
                warn!(path = %path.display(), errors = issues.len(), "summary rejected");
                rejected.push(RejectedFile { path, issues });
            }
        }
    }
    Aggregation {
        table: aggregate(verified),
        rejected,
    }
}

/// `aggregate`: ranks the summaries and optionally publishes the CSV.
///
/// # Errors
///
/// Returns CSV or I/O errors from the export.
pub fn aggregate_command(args: &AggregateArgs) -> Result<Aggregation> {
    let aggregation = aggregate_files(&args.files);
    if let Some(out) = &args.out {
        export_leaderboard(&aggregation.table, out)?;
        info!(path = %out.display(), "leaderboard written");
    }
    Ok(aggregation)
}

/// `serve`: aggregates the summaries and serves the table until shut down.
///
/// # Errors
///
/// Returns `Server` if the runtime cannot start or the listener fails.
#[cfg(feature = "api")]
pub fn serve(args: &crate::cli::ServeArgs) -> Result<Aggregation> {
    use std::net::SocketAddr;
    use std::sync::Arc;

    let aggregation = aggregate_files(&args.files);
    let state = Arc::new(crate::api::AppState::new(aggregation.table.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let rt = tokio::runtime::Runtime::new().map_err(DuelError::Server)?;
    rt.block_on(crate::api::serve(state, addr))
        .map_err(DuelError::Server)?;
    Ok(aggregation)
}
