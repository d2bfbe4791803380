//! Shared fixtures for integration tests.
#![allow(dead_code)]

use duel_sim::dataset::{Dataset, generate};
use duel_sim::policy::ControlPolicy;
use duel_sim::sim::{RunOutput, SimConfig, run};

/// Reference seed and length used across the suite.
pub const SEED: u64 = 42;
pub const HOURS: usize = 72;

/// The reference dataset (seed 42, 72 hours).
pub fn reference_dataset() -> Dataset {
    generate(SEED, HOURS).expect("reference dataset should generate")
}

/// Runs `policy` over `dataset` with default settings.
pub fn run_policy<P: ControlPolicy>(dataset: &Dataset, seed: u64, policy: P) -> RunOutput {
    run(SimConfig::new(seed, dataset.len()), dataset, policy).expect("run should succeed")
}
