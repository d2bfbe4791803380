//! Hourly scenario records and the immutable `Dataset` container.

use serde::{Deserialize, Serialize};

use crate::error::{DuelError, Result};

/// Weather observations attached to one hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeatherFeatures {
    /// Outdoor temperature (°C).
    pub temperature_c: f64,
    /// Relative humidity (%).
    pub humidity_pct: f64,
}

/// One hour of the scenario.
///
/// On disk the demand column is named `demand_kw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HourRecord {
    /// Position in the dataset, `0..N-1`.
    pub index: usize,
    /// ISO-8601 start of the hour.
    pub timestamp: String,
    /// Demand before any policy adjustment (kW).
    #[serde(rename = "demand_kw")]
    pub baseline_demand_kw: f64,
    /// Lowest comfortable grid draw (kW).
    pub comfort_bound_low: f64,
    /// Highest comfortable grid draw (kW).
    pub comfort_bound_high: f64,
    /// Weather observations for the hour.
    pub weather_features: WeatherFeatures,
    /// Time-of-use energy price ($/kWh).
    pub tariff_per_kwh: f64,
}

impl HourRecord {
    /// Whether `draw_kw` lies inside `[comfort_bound_low, comfort_bound_high]`.
    pub fn within_comfort(&self, draw_kw: f64) -> bool {
        draw_kw >= self.comfort_bound_low && draw_kw <= self.comfort_bound_high
    }
}

/// Ordered, immutable sequence of hour records with contiguous indices.
///
/// Construct with [`Dataset::from_records`] (which checks the index
/// invariant) or with the generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<HourRecord>,
}

impl Dataset {
    /// Wraps `records` after checking structural invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the dataset is empty, indices are not
    /// exactly `0..N-1` in order, a value is not finite, or a comfort band is
    /// inverted.
    pub fn from_records(records: Vec<HourRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(DuelError::config("dataset", "must contain at least one hour"));
        }
        for (position, record) in records.iter().enumerate() {
            if record.index != position {
                return Err(DuelError::config(
                    format!("dataset[{position}].index"),
                    format!("expected {position}, found {}", record.index),
                ));
            }
            let values = [
                record.baseline_demand_kw,
                record.comfort_bound_low,
                record.comfort_bound_high,
                record.tariff_per_kwh,
            ];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(DuelError::config(
                    format!("dataset[{position}]"),
                    "numeric fields must be finite",
                ));
            }
            if record.comfort_bound_low > record.comfort_bound_high {
                return Err(DuelError::config(
                    format!("dataset[{position}].comfort_bound_low"),
                    "must be <= comfort_bound_high",
                ));
            }
        }
        Ok(Self { records })
    }

    /// Number of hours.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false` for a constructed dataset; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in index order.
    pub fn records(&self) -> &[HourRecord] {
        &self.records
    }

    /// Record at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&HourRecord> {
        self.records.get(index)
    }

    /// Arithmetic mean of the baseline demand column.
    pub fn mean_demand_kw(&self) -> f64 {
        let sum: f64 = self.records.iter().map(|r| r.baseline_demand_kw).sum();
        sum / self.records.len() as f64
    }
}

impl<'de> Deserialize<'de> for Dataset {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let records = Vec::<HourRecord>::deserialize(deserializer)?;
        Dataset::from_records(records).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, demand: f64) -> HourRecord {
        HourRecord {
            index,
            timestamp: "2025-09-17T00:00:00Z".to_string(),
            baseline_demand_kw: demand,
            comfort_bound_low: demand - 0.2,
            comfort_bound_high: demand + 0.2,
            weather_features: WeatherFeatures {
                temperature_c: 21.0,
                humidity_pct: 50.0,
            },
            tariff_per_kwh: 0.08,
        }
    }

    #[test]
    fn accepts_contiguous_indices() {
        let ds = Dataset::from_records(vec![record(0, 1.0), record(1, 2.0)]).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.mean_demand_kw(), 1.5);
    }

    #[test]
    fn rejects_gap_in_indices() {
        let err = Dataset::from_records(vec![record(0, 1.0), record(2, 1.0)]).unwrap_err();
        assert!(matches!(err, DuelError::Configuration(ref e) if e.field == "dataset[1].index"));
    }

    #[test]
    fn rejects_empty() {
        assert!(Dataset::from_records(Vec::new()).is_err());
    }

    #[test]
    fn rejects_inverted_band() {
        let mut r = record(0, 1.0);
        r.comfort_bound_low = 2.0;
        assert!(Dataset::from_records(vec![r]).is_err());
    }

    #[test]
    fn json_uses_demand_kw_column() {
        let ds = Dataset::from_records(vec![record(0, 1.0)]).unwrap();
        let json = serde_json::to_value(&ds).unwrap();
        assert!(json[0].get("demand_kw").is_some());
        assert!(json[0].get("baseline_demand_kw").is_none());
        let back: Dataset = serde_json::from_value(json).unwrap();
        assert_eq!(back, ds);
    }

    #[test]
    fn deserialize_enforces_index_invariant() {
        let json = serde_json::to_value(vec![record(1, 1.0)]).unwrap();
        assert!(serde_json::from_value::<Dataset>(json).is_err());
    }

    #[test]
    fn within_comfort_is_inclusive() {
        let r = record(0, 1.0);
        assert!(r.within_comfort(0.8));
        assert!(r.within_comfort(1.2));
        assert!(!r.within_comfort(1.2001));
    }
}
