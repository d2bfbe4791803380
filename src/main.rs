//! `duel-sim` entry point: logging setup and subcommand dispatch.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use duel_sim::cli::{self, Command};
use duel_sim::runner;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Runs `command`; `Ok(false)` means some input was rejected.
fn dispatch(command: Command) -> duel_sim::Result<bool> {
    match command {
        Command::Help => {
            cli::print_usage();
            Ok(true)
        }
        Command::GenerateDataset(args) => {
            let dataset = runner::generate_dataset(&args)?;
            println!(
                "Generated {} hours (seed {}, mean demand {:.6} kW) -> {}",
                dataset.len(),
                args.seed,
                dataset.mean_demand_kw(),
                args.out.display()
            );
            Ok(true)
        }
        Command::RunSimulation(args) => {
            let outcome = runner::run_simulation(&args)?;
            for entry in outcome.output.trace.entries() {
                println!("{entry}");
            }
            let s = &outcome.output.summary;
            println!(
                "\n{}: average grid draw {:.6} kW, {} comfort violations over {} hours",
                s.strategy_id,
                s.average_grid_draw_kw,
                s.comfort_violations,
                s.simulation_duration_hours
            );
            println!("Integrity hash: {}", s.integrity_hash);
            println!("\n{}", outcome.report);
            Ok(true)
        }
        Command::Validate(args) => {
            let report = runner::validate_files(&args)?;
            println!("{report}");
            Ok(report.all_ok())
        }
        Command::Aggregate(args) => {
            let aggregation = runner::aggregate_command(&args)?;
            for rejected in &aggregation.rejected {
                println!("REJECTED {}", rejected.path.display());
                for issue in &rejected.issues {
                    println!("   - {issue}");
                }
            }
            println!("{}", aggregation.table);
            Ok(aggregation.rejected.is_empty())
        }
        #[cfg(feature = "api")]
        Command::Serve(args) => {
            runner::serve(&args)?;
            Ok(true)
        }
        #[cfg(not(feature = "api"))]
        Command::Serve(_) => {
            eprintln!("error: `serve` requires building with `--features api`");
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    let command = match cli::parse_args() {
        Ok(command) => command,
        Err(message) => {
            eprintln!("error: {message}");
            cli::print_usage();
            return ExitCode::FAILURE;
        }
    };
    init_tracing();

    match dispatch(command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
