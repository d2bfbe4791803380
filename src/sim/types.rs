//! Core simulation types: run configuration, per-hour trace, and run output.

use std::fmt;

use serde::Serialize;

use crate::config::ScenarioConfig;
use crate::record::SummaryRecord;
use crate::timestamp::Timestamp;

/// Parameters of one simulation run.
///
/// # Examples
///
/// ```
/// use duel_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(42, 72);
/// assert_eq!(cfg.physical_max_draw_kw, 5.0);
/// assert!(cfg.timestamp.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Seed of the dataset being simulated; copied into the summary.
    pub seed: u64,
    /// Expected dataset length in hours.
    pub hours: usize,
    /// Upper clamp on every hour's grid draw (kW).
    pub physical_max_draw_kw: f64,
    /// Summary timestamp; defaults to the scenario end when `None`.
    pub timestamp: Option<Timestamp>,
}

impl SimConfig {
    /// Configuration with the default physical limit and no timestamp override.
    pub fn new(seed: u64, hours: usize) -> Self {
        Self {
            seed,
            hours,
            physical_max_draw_kw: 5.0,
            timestamp: None,
        }
    }

    /// Builds the run configuration from the `[simulation]` section.
    pub fn from_scenario(scenario: &ScenarioConfig) -> Self {
        let s = &scenario.simulation;
        Self {
            seed: s.seed,
            hours: s.hours,
            physical_max_draw_kw: s.physical_max_draw_kw,
            timestamp: None,
        }
    }

    /// Sets the summary timestamp.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Record of one simulated hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    /// Hour index.
    pub hour_index: usize,
    /// Demand before adjustment (kW).
    pub baseline_demand_kw: f64,
    /// Adjustment issued by the policy (kW).
    pub adjustment_kw: f64,
    /// Clamped grid draw (kW).
    pub actual_draw_kw: f64,
    /// Whether `actual_draw_kw` left the comfort band.
    pub violation: bool,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "h={:>3} | demand={:>6.3} kW  adj={:>+7.3} kW  draw={:>6.3} kW | violation={}",
            self.hour_index,
            self.baseline_demand_kw,
            self.adjustment_kw,
            self.actual_draw_kw,
            self.violation,
        )
    }
}

/// Ordered per-hour results of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SimulationTrace {
    entries: Vec<TraceEntry>,
}

impl SimulationTrace {
    /// Empty trace with room for `hours` entries.
    pub fn with_capacity(hours: usize) -> Self {
        Self {
            entries: Vec::with_capacity(hours),
        }
    }

    pub(crate) fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    /// Entries in hour order.
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Number of hours recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Arithmetic mean of `actual_draw_kw`, summed in hour order.
    ///
    /// Returns `0.0` for an empty trace.
    pub fn mean_draw_kw(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.entries.iter().map(|e| e.actual_draw_kw).sum();
        sum / self.entries.len() as f64
    }

    /// Hours flagged as comfort violations.
    pub fn violation_count(&self) -> usize {
        self.entries.iter().filter(|e| e.violation).count()
    }
}

/// Trace and sealed summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Per-hour results.
    pub trace: SimulationTrace,
    /// Sealed summary record.
    pub summary: SummaryRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hour_index: usize, draw: f64, violation: bool) -> TraceEntry {
        TraceEntry {
            hour_index,
            baseline_demand_kw: draw,
            adjustment_kw: 0.0,
            actual_draw_kw: draw,
            violation,
        }
    }

    #[test]
    fn mean_and_violations() {
        let mut trace = SimulationTrace::with_capacity(3);
        trace.push(entry(0, 1.0, false));
        trace.push(entry(1, 2.0, true));
        trace.push(entry(2, 3.0, false));
        assert_eq!(trace.mean_draw_kw(), 2.0);
        assert_eq!(trace.violation_count(), 1);
    }

    #[test]
    fn empty_trace_mean_is_zero() {
        assert_eq!(SimulationTrace::default().mean_draw_kw(), 0.0);
    }

    #[test]
    fn from_scenario_copies_simulation_section() {
        let mut scenario = ScenarioConfig::baseline();
        scenario.simulation.seed = 9;
        scenario.simulation.physical_max_draw_kw = 3.5;
        let cfg = SimConfig::from_scenario(&scenario);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.hours, 72);
        assert_eq!(cfg.physical_max_draw_kw, 3.5);
    }

    #[test]
    fn trace_entry_display_does_not_panic() {
        let s = format!("{}", entry(3, 0.9, false));
        assert!(s.contains("h=  3"));
    }
}
