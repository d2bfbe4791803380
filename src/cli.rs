//! Command-line parsing for the `duel-sim` binary.

use std::env;
use std::path::PathBuf;

/// `generate-dataset` options.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateArgs {
    pub seed: u64,
    pub hours: usize,
    pub out: PathBuf,
    pub config: Option<PathBuf>,
}

/// `run-simulation` options.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateArgs {
    pub dataset: PathBuf,
    pub policy: String,
    /// Seed the dataset claims to come from; checked by regeneration.
    pub seed: Option<u64>,
    pub trace_out: PathBuf,
    pub summary_out: PathBuf,
    pub config: Option<PathBuf>,
    pub timestamp: Option<String>,
}

/// `validate` options.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Built-in schema name or schema file path.
    pub schema: String,
    /// Where to write the JSON report, if anywhere.
    pub report: Option<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// `aggregate` options.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateArgs {
    pub out: Option<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// `serve` options.
#[derive(Debug, Clone, PartialEq)]
pub struct ServeArgs {
    pub port: u16,
    pub files: Vec<PathBuf>,
}

/// A parsed invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GenerateDataset(GenerateArgs),
    RunSimulation(SimulateArgs),
    Validate(ValidateArgs),
    Aggregate(AggregateArgs),
    Serve(ServeArgs),
    Help,
}

/// Parses the process arguments.
///
/// # Errors
///
/// Returns a message suitable for stderr when the arguments are invalid.
pub fn parse_args() -> Result<Command, String> {
    parse_args_from(env::args().skip(1).collect())
}

/// Parses `args` (without the program name).
///
/// # Errors
///
/// Returns a message naming the offending argument.
pub fn parse_args_from(args: Vec<String>) -> Result<Command, String> {
    let Some((subcommand, rest)) = args.split_first() else {
        return Err("missing subcommand (try --help)".to_string());
    };
    if rest.iter().any(|a| a == "--help" || a == "-h") {
        return Ok(Command::Help);
    }
    match subcommand.as_str() {
        "--help" | "-h" | "help" => Ok(Command::Help),
        "generate-dataset" => parse_generate(rest).map(Command::GenerateDataset),
        "run-simulation" => parse_simulate(rest).map(Command::RunSimulation),
        "validate" => parse_validate(rest).map(Command::Validate),
        "aggregate" => parse_aggregate(rest).map(Command::Aggregate),
        "serve" => parse_serve(rest).map(Command::Serve),
        other => Err(format!("unknown subcommand: {other}")),
    }
}

/// Flag/value pairs and positional arguments of one subcommand.
#[derive(Default)]
struct Parsed {
    flags: Vec<(String, String)>,
    positional: Vec<String>,
}

impl Parsed {
    fn take(&mut self, flag: &str) -> Result<Option<String>, String> {
        let mut found = self.flags.iter().filter(|(f, _)| f == flag);
        let first = found.next().map(|(_, v)| v.clone());
        if found.next().is_some() {
            return Err(format!("{flag} provided more than once"));
        }
        self.flags.retain(|(f, _)| f != flag);
        Ok(first)
    }

    fn require(&mut self, flag: &str) -> Result<String, String> {
        self.take(flag)?
            .ok_or_else(|| format!("missing required argument {flag}"))
    }

    fn finish(self) -> Result<Vec<String>, String> {
        match self.flags.first() {
            Some((flag, _)) => Err(format!("unknown argument: {flag}")),
            None => Ok(self.positional),
        }
    }
}

fn split(args: &[String]) -> Result<Parsed, String> {
    let mut parsed = Parsed::default();
    let mut i = 0usize;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg.starts_with("--") {
            i += 1;
            let value = args.next_or_err(i, &format!("missing value for {arg}"))?;
            parsed.flags.push((arg.to_string(), value.to_string()));
        } else {
            parsed.positional.push(arg.to_string());
        }
        i += 1;
    }
    Ok(parsed)
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str, kind: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{flag} value \"{value}\" is not a valid {kind}"))
}

fn no_positional(positional: Vec<String>) -> Result<(), String> {
    match positional.first() {
        Some(extra) => Err(format!("unexpected argument: {extra}")),
        None => Ok(()),
    }
}

fn at_least_one(files: Vec<String>, what: &str) -> Result<Vec<PathBuf>, String> {
    if files.is_empty() {
        return Err(format!("expected at least one {what}"));
    }
    Ok(files.into_iter().map(PathBuf::from).collect())
}

fn parse_generate(args: &[String]) -> Result<GenerateArgs, String> {
    let mut p = split(args)?;
    let seed = p.require("--seed")?;
    let hours = p.require("--hours")?;
    let out = p.require("--out")?;
    let config = p.take("--config")?;
    no_positional(p.finish()?)?;

    let hours: usize = parse_number("--hours", &hours, "positive integer")?;
    if hours == 0 {
        return Err("--hours must be > 0".to_string());
    }
    Ok(GenerateArgs {
        seed: parse_number("--seed", &seed, "non-negative integer")?,
        hours,
        out: PathBuf::from(out),
        config: config.map(PathBuf::from),
    })
}

fn parse_simulate(args: &[String]) -> Result<SimulateArgs, String> {
    let mut p = split(args)?;
    let dataset = p.require("--dataset")?;
    let policy = p.require("--policy")?;
    let seed = p.take("--seed")?;
    let trace_out = p.require("--trace-out")?;
    let summary_out = p.require("--summary-out")?;
    let config = p.take("--config")?;
    let timestamp = p.take("--timestamp")?;
    no_positional(p.finish()?)?;

    if trace_out == summary_out {
        return Err("--trace-out and --summary-out must differ".to_string());
    }
    Ok(SimulateArgs {
        dataset: PathBuf::from(dataset),
        policy,
        seed: seed
            .map(|s| parse_number("--seed", &s, "non-negative integer"))
            .transpose()?,
        trace_out: PathBuf::from(trace_out),
        summary_out: PathBuf::from(summary_out),
        config: config.map(PathBuf::from),
        timestamp,
    })
}

fn parse_validate(args: &[String]) -> Result<ValidateArgs, String> {
    let mut p = split(args)?;
    let schema = p.require("--schema")?;
    let report = p.take("--report")?;
    let files = at_least_one(p.finish()?, "file to validate")?;
    Ok(ValidateArgs {
        schema,
        report: report.map(PathBuf::from),
        files,
    })
}

fn parse_aggregate(args: &[String]) -> Result<AggregateArgs, String> {
    let mut p = split(args)?;
    let out = p.take("--out")?;
    let files = at_least_one(p.finish()?, "summary file")?;
    Ok(AggregateArgs {
        out: out.map(PathBuf::from),
        files,
    })
}

fn parse_serve(args: &[String]) -> Result<ServeArgs, String> {
    let mut p = split(args)?;
    let port = match p.take("--port")? {
        Some(port) => parse_number("--port", &port, "u16")?,
        None => 3000,
    };
    let files = at_least_one(p.finish()?, "summary file")?;
    Ok(ServeArgs { port, files })
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

const USAGE: &[&str] = &[
    "generate-dataset --seed <u64> --hours <n> --out <file> [--config <toml>]",
    "run-simulation --dataset <file> --policy <id> [--seed <u64>] --trace-out <csv> \
     --summary-out <json> [--config <toml>] [--timestamp <iso8601>]",
    "validate --schema <summary_record|narrative_log|file> [--report <json>] <file>...",
    "aggregate [--out <csv>] <summary>...",
    "serve [--port <u16>] <summary>...  (requires the `api` feature)",
];

/// Prints the full usage text to stderr.
pub fn print_usage() {
    eprintln!("duel-sim - seeded demand-response duel simulator and scorer");
    eprintln!();
    eprintln!("Usage:");
    for line in USAGE {
        eprintln!("  duel-sim {line}");
    }
    eprintln!();
    eprintln!("Policies: baseline, peak_shaving, floor_tracking");
    eprintln!("Set RUST_LOG (e.g. RUST_LOG=debug) to change log verbosity.");
}
