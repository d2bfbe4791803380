//! Seeded demand-response duel simulator with an integrity-checked leaderboard.
//!
//! Pipeline: [`dataset::generate`] builds an hourly scenario from a seed,
//! [`sim::run`] drives a [`policy::ControlPolicy`] over it and seals a
//! [`record::SummaryRecord`], [`validate`] re-checks persisted records, and
//! [`leaderboard::aggregate`] ranks the ones that verify.

/// Read-only HTTP view of a leaderboard.
#[cfg(feature = "api")]
pub mod api;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod integrity;
pub mod io;
pub mod leaderboard;
pub mod policy;
pub mod record;
pub mod runner;
/// Simulation engine, trace types, and KPI report.
pub mod sim;
pub mod timestamp;
pub mod validate;

pub use error::{DuelError, Result};
