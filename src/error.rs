//! Error taxonomy for generation, simulation, validation, and aggregation.
//!
//! Hour-level comfort violations are recorded in the trace and never appear
//! here. Validation findings are collected as data by the validator; the
//! `SchemaValidation` and `Integrity` variants exist for callers that need a
//! single hard failure (for example, loading one summary for aggregation).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Every failure the engine can report.
#[derive(Debug, Error)]
pub enum DuelError {
    /// Bad seed, hours, policy reference, or dataset/policy pairing.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Several configuration fields failed validation at once.
    #[error("invalid scenario: {}", join_config_errors(.0))]
    InvalidScenario(Vec<ConfigError>),

    /// A policy asked for a record newer than the hour it is deciding.
    #[error("causality violation: deciding hour {current} but accessed hour {requested}")]
    CausalityViolation {
        /// Hour being decided.
        current: usize,
        /// Hour the policy tried to read or decide for.
        requested: usize,
    },

    /// A required field is missing or malformed.
    #[error("schema validation failed at {path}: {message}")]
    SchemaValidation {
        /// JSON path of the offending value (e.g. `$.seed`).
        path: String,
        /// What was wrong.
        message: String,
    },

    /// Stored hash does not match the hash recomputed from the record's fields.
    #[error("integrity check failed: stored {stored}, recomputed {recomputed}")]
    Integrity {
        /// Hash found in the record.
        stored: String,
        /// Hash computed from the record's own field values.
        recomputed: String,
    },

    /// Regenerating a dataset from its seed produced different data.
    #[error("determinism violation: seed {seed} regenerates a different `{field}` at hour {hour_index}")]
    DeterminismViolation {
        /// Seed used for regeneration.
        seed: u64,
        /// First hour that differs.
        hour_index: usize,
        /// First field that differs at that hour.
        field: String,
    },

    /// Filesystem failure, with the path that caused it.
    #[error("I/O error on `{}`: {source}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The HTTP server could not start or stopped with an error.
    #[error("server error: {0}")]
    Server(#[source] io::Error),

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl DuelError {
    /// Wraps an `io::Error` with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a single-field configuration error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration(ConfigError::new(field, message))
    }
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias used throughout the crate.
pub type Result<T, E = DuelError> = std::result::Result<T, E>;
