//! Sealed per-run summary records.
//!
//! A [`SummaryRecord`] carries an `integrity_hash` over every other field.
//! Records are sealed once by [`SummaryRecord::new`]; any later edit makes
//! [`SummaryRecord::verify`] fail. Records read from disk are checked with
//! [`SummaryRecord::verify_json`], which hashes the values exactly as they
//! appear in the file. Only a [`VerifiedRecord`] can enter a leaderboard.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DuelError, Result};
use crate::integrity::{INTEGRITY_FIELD, hash_excluding, record_hash};
use crate::timestamp::Timestamp;

/// Outcome of one simulation run, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummaryRecord {
    /// Seed the dataset was generated from.
    pub seed: u64,
    /// Number of simulated hours.
    pub simulation_duration_hours: usize,
    /// Policy that produced the run.
    pub strategy_id: String,
    /// Exact mean of the trace's grid draw (kW).
    pub average_grid_draw_kw: f64,
    /// Hours whose draw left the comfort band.
    pub comfort_violations: usize,
    /// ISO-8601 instant the run is attributed to.
    pub timestamp: String,
    /// Lowercase hex SHA-256 over the canonical form of the other fields.
    pub integrity_hash: String,
}

impl SummaryRecord {
    /// Builds and seals a record.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the record cannot be serialized for hashing.
    pub fn new(
        seed: u64,
        simulation_duration_hours: usize,
        strategy_id: impl Into<String>,
        average_grid_draw_kw: f64,
        comfort_violations: usize,
        timestamp: &Timestamp,
    ) -> Result<Self> {
        let mut record = Self {
            seed,
            simulation_duration_hours,
            strategy_id: strategy_id.into(),
            average_grid_draw_kw,
            comfort_violations,
            timestamp: timestamp.to_iso8601(),
            integrity_hash: String::new(),
        };
        record.integrity_hash = record.recompute_hash()?;
        Ok(record)
    }

    /// Hash of the record's current field values.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the record cannot be serialized.
    pub fn recompute_hash(&self) -> Result<String> {
        record_hash(self)
    }

    /// Checks the stored hash and timestamp.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityError` if the stored hash differs from the
    /// recomputed one, or `SchemaValidationError` if the timestamp is not
    /// ISO-8601.
    pub fn verify(self) -> Result<VerifiedRecord> {
        let recomputed = self.recompute_hash()?;
        check_hash(&self.integrity_hash, recomputed)?;
        self.into_verified()
    }

    /// Checks a record as parsed from JSON.
    ///
    /// The hash is recomputed over `value`'s own fields, so a number written
    /// as `1` is hashed as `1` even though the struct holds `1.0`.
    ///
    /// # Errors
    ///
    /// Returns `IntegrityError` on a hash mismatch and
    /// `SchemaValidationError` or a JSON error if `value` is not a summary
    /// record.
    pub fn verify_json(value: Value) -> Result<VerifiedRecord> {
        let stored = value
            .get(INTEGRITY_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| DuelError::SchemaValidation {
                path: format!("$.{INTEGRITY_FIELD}"),
                message: "missing or not a string".to_string(),
            })?;
        check_hash(&stored, hash_excluding(&value, INTEGRITY_FIELD))?;
        let record: SummaryRecord = serde_json::from_value(value)?;
        record.into_verified()
    }

    fn into_verified(self) -> Result<VerifiedRecord> {
        let instant =
            Timestamp::parse(&self.timestamp).map_err(|e| DuelError::SchemaValidation {
                path: "$.timestamp".to_string(),
                message: e.to_string(),
            })?;
        Ok(VerifiedRecord {
            record: self,
            instant,
        })
    }
}

fn check_hash(stored: &str, recomputed: String) -> Result<()> {
    if stored != recomputed {
        return Err(DuelError::Integrity {
            stored: stored.to_string(),
            recomputed,
        });
    }
    Ok(())
}

/// A summary record whose hash and timestamp have been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedRecord {
    record: SummaryRecord,
    instant: Timestamp,
}

impl VerifiedRecord {
    /// The underlying record.
    pub fn record(&self) -> &SummaryRecord {
        &self.record
    }

    /// Parsed `timestamp`.
    pub fn instant(&self) -> Timestamp {
        self.instant
    }

    /// Stored (and verified) integrity hash.
    pub fn hash(&self) -> &str {
        &self.record.integrity_hash
    }

    /// Unwraps the record.
    pub fn into_record(self) -> SummaryRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed() -> SummaryRecord {
        SummaryRecord::new(
            42,
            72,
            "baseline",
            0.96,
            0,
            &Timestamp::from_epoch_seconds(1_758_326_400).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn new_record_verifies() {
        let verified = sealed().verify().unwrap();
        assert_eq!(verified.record().timestamp, "2025-09-20T00:00:00Z");
        assert_eq!(verified.hash().len(), 64);
    }

    #[test]
    fn hash_survives_json_round_trip() {
        let record = sealed();
        let text = serde_json::to_string_pretty(&record).unwrap();
        let back: SummaryRecord = serde_json::from_str(&text).unwrap();
        assert!(back.verify().is_ok());
    }

    #[test]
    fn every_field_is_covered_by_the_hash() {
        let edits: Vec<fn(&mut SummaryRecord)> = vec![
            |r| r.seed += 1,
            |r| r.simulation_duration_hours += 1,
            |r| r.strategy_id.push('x'),
            |r| r.average_grid_draw_kw -= 0.001,
            |r| r.comfort_violations += 1,
            |r| r.timestamp = "2025-09-20T00:00:01Z".to_string(),
        ];
        for edit in edits {
            let mut record = sealed();
            edit(&mut record);
            assert!(matches!(record.verify(), Err(DuelError::Integrity { .. })));
        }
    }

    #[test]
    fn bad_timestamp_is_schema_error() {
        let mut record = sealed();
        record.timestamp = "yesterday".to_string();
        record.integrity_hash = record.recompute_hash().unwrap();
        assert!(matches!(
            record.verify(),
            Err(DuelError::SchemaValidation { ref path, .. }) if path == "$.timestamp"
        ));
    }

    #[test]
    fn verify_json_hashes_values_as_written() {
        let mut value = serde_json::to_value(sealed()).unwrap();
        value["average_grid_draw_kw"] = serde_json::json!(1);
        value[INTEGRITY_FIELD] = serde_json::json!(hash_excluding(&value, INTEGRITY_FIELD));

        let verified = SummaryRecord::verify_json(value.clone()).unwrap();
        assert_eq!(verified.record().average_grid_draw_kw, 1.0);
        assert_eq!(verified.hash(), value[INTEGRITY_FIELD].as_str().unwrap());

        value["comfort_violations"] = serde_json::json!(3);
        assert!(matches!(
            SummaryRecord::verify_json(value),
            Err(DuelError::Integrity { .. })
        ));
    }

    #[test]
    fn verify_json_needs_a_hash() {
        let mut value = serde_json::to_value(sealed()).unwrap();
        value.as_object_mut().unwrap().remove(INTEGRITY_FIELD);
        assert!(matches!(
            SummaryRecord::verify_json(value),
            Err(DuelError::SchemaValidation { .. })
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut value = serde_json::to_value(sealed()).unwrap();
        value["bonus"] = serde_json::json!(1);
        assert!(serde_json::from_value::<SummaryRecord>(value).is_err());
    }
}
