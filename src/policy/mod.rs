//! Control policies and the causal window they decide from.
//!
//! A policy sees a [`VisibleWindow`] holding only the records up to and
//! including the hour being decided. State is threaded explicitly: each call
//! to [`ControlPolicy::decide`] consumes the previous [`PolicyState`] and
//! returns the next one, so a policy value can be shared across concurrent
//! runs without interior mutability.

pub mod baseline;
pub mod floor_tracking;
pub mod peak_shaving;

use crate::config::ScenarioConfig;
use crate::dataset::HourRecord;
use crate::error::{DuelError, Result};

pub use baseline::BaselinePolicy;
pub use floor_tracking::{FloorTrackingPolicy, RampState};
pub use peak_shaving::{PeakShavingPolicy, StorageState};

/// Strategy ids accepted by [`Policy::from_id`].
pub const POLICY_IDS: &[&str] = &["baseline", "peak_shaving", "floor_tracking"];

/// Inset applied to comfort bounds when a policy targets a band edge, so the
/// resulting draw stays inside after float rounding.
const COMFORT_INSET_KW: f64 = 1e-9;

/// Records `0..=current_hour` of a dataset.
///
/// The engine builds one per hour from a prefix slice, so later records are
/// not reachable through this type at all. [`VisibleWindow::get`] still
/// checks the index and reports a `CausalityViolation` for anything past the
/// current hour.
#[derive(Debug, Clone, Copy)]
pub struct VisibleWindow<'a> {
    records: &'a [HourRecord],
}

impl<'a> VisibleWindow<'a> {
    /// Wraps the prefix `records`; its last element is the current hour.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if `records` is empty.
    pub fn new(records: &'a [HourRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(DuelError::config("window", "must contain the current hour"));
        }
        Ok(Self { records })
    }

    /// Index of the hour being decided.
    pub fn current_hour(&self) -> usize {
        self.records.len() - 1
    }

    /// Record of the hour being decided.
    pub fn current(&self) -> &'a HourRecord {
        &self.records[self.records.len() - 1]
    }

    /// Record at `index`.
    ///
    /// # Errors
    ///
    /// Returns `CausalityViolation` if `index` is after the current hour.
    pub fn get(&self, index: usize) -> Result<&'a HourRecord> {
        self.records.get(index).ok_or(DuelError::CausalityViolation {
            current: self.current_hour(),
            requested: index,
        })
    }

    /// The most recent `hours` records, ending with the current one.
    pub fn trailing(&self, hours: usize) -> &'a [HourRecord] {
        let start = self.records.len().saturating_sub(hours);
        &self.records[start..]
    }

    /// Every visible record.
    pub fn records(&self) -> &'a [HourRecord] {
        self.records
    }

    /// Number of visible records (`current_hour + 1`).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false`; a window holds at least the current hour.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Adjustment issued for exactly one hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlDecision {
    /// Hour this decision applies to.
    pub hour_index: usize,
    /// Change to the baseline draw (kW, positive = consume more).
    pub adjustment_kw: f64,
}

impl ControlDecision {
    /// Decision for `hour_index` with `adjustment_kw`.
    pub fn new(hour_index: usize, adjustment_kw: f64) -> Self {
        Self {
            hour_index,
            adjustment_kw,
        }
    }
}

/// Per-run policy state, owned by the engine and handed back each hour.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyState {
    /// Policies that keep nothing between hours.
    Stateless,
    /// Virtual storage level for peak shaving.
    Storage(StorageState),
    /// Previous adjustment for ramp-limited policies.
    Ramp(RampState),
}

/// Decision-maker driven hour by hour by the simulation engine.
pub trait ControlPolicy {
    /// Stable identifier written into summary records.
    fn strategy_id(&self) -> &str;

    /// State before hour 0.
    fn initial_state(&self) -> PolicyState;

    /// Decides the adjustment for `hour_index` from `window` and `state`.
    ///
    /// # Errors
    ///
    /// Returns `CausalityViolation` if the policy reads past `hour_index`,
    /// or `ConfigurationError` if `state` is not the policy's own kind.
    fn decide(
        &self,
        hour_index: usize,
        window: &VisibleWindow<'_>,
        state: PolicyState,
    ) -> Result<(ControlDecision, PolicyState)>;
}

/// Built-in policies, dispatched by tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Policy {
    /// Zero adjustment every hour.
    Baseline(BaselinePolicy),
    /// Virtual battery flattening demand toward its trailing mean.
    PeakShaving(PeakShavingPolicy),
    /// Ramp-limited tracking of the comfort floor.
    FloorTracking(FloorTrackingPolicy),
}

impl Policy {
    /// Builds the policy named `id` with parameters from `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` for an unknown id.
    pub fn from_id(id: &str, config: &ScenarioConfig) -> Result<Self> {
        match id {
            "baseline" => Ok(Self::Baseline(BaselinePolicy)),
            "peak_shaving" => Ok(Self::PeakShaving(PeakShavingPolicy::new(
                config.peak_shaving.clone(),
            ))),
            "floor_tracking" => Ok(Self::FloorTracking(FloorTrackingPolicy::new(
                config.floor_tracking.clone(),
            ))),
            other => Err(DuelError::config(
                "policy",
                format!("unknown policy \"{other}\", available: {}", POLICY_IDS.join(", ")),
            )),
        }
    }
}

impl ControlPolicy for Policy {
    fn strategy_id(&self) -> &str {
        match self {
            Self::Baseline(p) => p.strategy_id(),
            Self::PeakShaving(p) => p.strategy_id(),
            Self::FloorTracking(p) => p.strategy_id(),
        }
    }

    fn initial_state(&self) -> PolicyState {
        match self {
            Self::Baseline(p) => p.initial_state(),
            Self::PeakShaving(p) => p.initial_state(),
            Self::FloorTracking(p) => p.initial_state(),
        }
    }

    fn decide(
        &self,
        hour_index: usize,
        window: &VisibleWindow<'_>,
        state: PolicyState,
    ) -> Result<(ControlDecision, PolicyState)> {
        match self {
            Self::Baseline(p) => p.decide(hour_index, window, state),
            Self::PeakShaving(p) => p.decide(hour_index, window, state),
            Self::FloorTracking(p) => p.decide(hour_index, window, state),
        }
    }
}

/// Adjustments `[lo, hi]` that keep `record`'s draw inside its comfort band.
///
/// Degenerate bands collapse to their midpoint.
pub(crate) fn comfort_adjustment_range(record: &HourRecord) -> (f64, f64) {
    let low = record.comfort_bound_low;
    let high = record.comfort_bound_high;
    let (target_low, target_high) = if high - low > 2.0 * COMFORT_INSET_KW {
        (low + COMFORT_INSET_KW, high - COMFORT_INSET_KW)
    } else {
        let mid = low + (high - low) / 2.0;
        (mid, mid)
    };
    (
        target_low - record.baseline_demand_kw,
        target_high - record.baseline_demand_kw,
    )
}

fn state_mismatch(policy: &str) -> DuelError {
    DuelError::config("policy_state", format!("state does not belong to {policy}"))
}


#[cfg(test)]
mod tests {
    use super::test_support::hour;
    use super::*;

    #[test]
    fn window_rejects_future_index() {
        let records = vec![hour(0, 1.0, 0.2), hour(1, 1.0, 0.2), hour(2, 1.0, 0.2)];
        let window = VisibleWindow::new(&records[..2]).unwrap();
        assert_eq!(window.current_hour(), 1);
        assert!(window.get(1).is_ok());
        let err = window.get(2).unwrap_err();
        assert!(matches!(
            err,
            DuelError::CausalityViolation {
                current: 1,
                requested: 2
            }
        ));
    }

    #[test]
    fn trailing_is_clipped_to_history() {
        let records: Vec<_> = (0..5).map(|i| hour(i, 1.0, 0.2)).collect();
        let window = VisibleWindow::new(&records).unwrap();
        assert_eq!(window.trailing(3).len(), 3);
        assert_eq!(window.trailing(3)[0].index, 2);
        assert_eq!(window.trailing(99).len(), 5);
    }

    #[test]
    fn empty_window_is_rejected() {
        assert!(VisibleWindow::new(&[]).is_err());
    }

    #[test]
    fn from_id_knows_every_listed_policy() {
        let cfg = ScenarioConfig::baseline();
        for id in POLICY_IDS {
            let policy = Policy::from_id(id, &cfg).unwrap();
            assert_eq!(policy.strategy_id(), *id);
        }
        assert!(matches!(
            Policy::from_id("oracle", &cfg),
            Err(DuelError::Configuration(_))
        ));
    }

    #[test]
    fn comfort_range_keeps_draw_inside() {
        let r = hour(0, 0.96, 0.15);
        let (lo, hi) = comfort_adjustment_range(&r);
        assert!(r.within_comfort(r.baseline_demand_kw + lo));
        assert!(r.within_comfort(r.baseline_demand_kw + hi));
    }

    #[test]
    fn degenerate_band_collapses_to_midpoint() {
        let mut r = hour(0, 1.0, 0.0);
        r.comfort_bound_low = 1.0;
        r.comfort_bound_high = 1.0;
        assert_eq!(comfort_adjustment_range(&r), (0.0, 0.0));
    }
}
