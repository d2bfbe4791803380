//! Post-hoc KPI computation from a simulation trace.
//!
//! These figures are for reporting only. Ranking uses the summary record's
//! average draw and violation count, never this report.

use std::fmt;

use serde::Serialize;

use crate::dataset::Dataset;

use super::types::SimulationTrace;

/// Aggregate indicators derived from a complete run.
///
/// Computed post-hoc from the trace so the report cannot disagree with the
/// per-hour data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Highest hourly grid draw (kW).
    pub peak_draw_kw: f64,
    /// Lowest hourly grid draw (kW).
    pub min_draw_kw: f64,
    /// Highest hourly baseline demand (kW).
    pub peak_demand_kw: f64,
    /// Total energy drawn (kWh; one-hour steps).
    pub total_energy_kwh: f64,
    /// Energy cost at each hour's tariff.
    pub energy_cost: f64,
    /// Cost of the unadjusted baseline demand at the same tariffs.
    pub baseline_cost: f64,
    /// Mean absolute policy adjustment (kW).
    pub mean_abs_adjustment_kw: f64,
    /// Share of hours outside the comfort band (%).
    pub violation_rate_pct: f64,
}

impl RunReport {
    /// Computes all KPIs from `trace` and the tariffs in `dataset`.
    ///
    /// Hours missing from `dataset` are priced at zero. An empty trace
    /// yields an all-zero report.
    pub fn from_trace(trace: &SimulationTrace, dataset: &Dataset) -> Self {
        let entries = trace.entries();
        if entries.is_empty() {
            return Self {
                peak_draw_kw: 0.0,
                min_draw_kw: 0.0,
                peak_demand_kw: 0.0,
                total_energy_kwh: 0.0,
                energy_cost: 0.0,
                baseline_cost: 0.0,
                mean_abs_adjustment_kw: 0.0,
                violation_rate_pct: 0.0,
            };
        }

        let n = entries.len() as f64;
        let mut peak_draw = f64::NEG_INFINITY;
        let mut min_draw = f64::INFINITY;
        let mut peak_demand = f64::NEG_INFINITY;
        let mut energy = 0.0;
        let mut cost = 0.0;
        let mut baseline_cost = 0.0;
        let mut abs_adjustment = 0.0;

        for e in entries {
            let tariff = dataset
                .get(e.hour_index)
                .map_or(0.0, |r| r.tariff_per_kwh);
            peak_draw = peak_draw.max(e.actual_draw_kw);
            min_draw = min_draw.min(e.actual_draw_kw);
            peak_demand = peak_demand.max(e.baseline_demand_kw);
            energy += e.actual_draw_kw;
            cost += e.actual_draw_kw * tariff;
            baseline_cost += e.baseline_demand_kw * tariff;
            abs_adjustment += e.adjustment_kw.abs();
        }

        Self {
            peak_draw_kw: peak_draw,
            min_draw_kw: min_draw,
            peak_demand_kw: peak_demand,
            total_energy_kwh: energy,
            energy_cost: cost,
            baseline_cost,
            mean_abs_adjustment_kw: abs_adjustment / n,
            violation_rate_pct: 100.0 * trace.violation_count() as f64 / n,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(
            f,
            "Peak draw:             {:.3} kW (baseline peak {:.3} kW)",
            self.peak_draw_kw, self.peak_demand_kw
        )?;
        writeln!(f, "Min draw:              {:.3} kW", self.min_draw_kw)?;
        writeln!(f, "Energy drawn:          {:.3} kWh", self.total_energy_kwh)?;
        writeln!(
            f,
            "Energy cost:           ${:.2} (baseline ${:.2})",
            self.energy_cost, self.baseline_cost
        )?;
        writeln!(f, "Mean |adjustment|:     {:.3} kW", self.mean_abs_adjustment_kw)?;
        write!(f, "Comfort violations:    {:.1}%", self.violation_rate_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::generate;
    use crate::policy::BaselinePolicy;
    use crate::sim::engine::run;
    use crate::sim::types::SimConfig;

    #[test]
    fn baseline_report_matches_dataset() {
        let ds = generate(42, 24).unwrap();
        let out = run(SimConfig::new(42, 24), &ds, BaselinePolicy).unwrap();
        let kpi = RunReport::from_trace(&out.trace, &ds);
        assert_eq!(kpi.peak_draw_kw, kpi.peak_demand_kw);
        assert_eq!(kpi.energy_cost, kpi.baseline_cost);
        assert_eq!(kpi.mean_abs_adjustment_kw, 0.0);
        assert_eq!(kpi.violation_rate_pct, 0.0);
        assert!((kpi.total_energy_kwh - 0.96 * 24.0).abs() < 1e-9);
    }

    #[test]
    fn empty_trace() {
        let ds = generate(1, 1).unwrap();
        let kpi = RunReport::from_trace(&SimulationTrace::default(), &ds);
        assert_eq!(kpi.peak_draw_kw, 0.0);
        assert_eq!(kpi.violation_rate_pct, 0.0);
    }

    #[test]
    fn display_lists_every_metric() {
        let ds = generate(42, 24).unwrap();
        let out = run(SimConfig::new(42, 24), &ds, BaselinePolicy).unwrap();
        let text = RunReport::from_trace(&out.trace, &ds).to_string();
        assert!(text.starts_with("--- KPI Report ---"));
        assert!(text.contains("Energy cost"));
        assert!(text.contains("Comfort violations"));
    }
}
