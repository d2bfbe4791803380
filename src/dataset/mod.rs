//! Deterministic hourly scenario datasets.

/// Seeded scenario generator.
pub mod generator;
pub mod types;

pub use generator::{SCENARIO_START_EPOCH, generate, generate_with, verify_reproducible};
pub use types::{Dataset, HourRecord, WeatherFeatures};
