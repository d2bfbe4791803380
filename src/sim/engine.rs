//! Simulation engine that drives a policy hour by hour over a dataset.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::error::{DuelError, Result};
use crate::policy::{ControlPolicy, PolicyState, VisibleWindow};
use crate::record::SummaryRecord;
use crate::timestamp::Timestamp;

use super::clock::Clock;
use super::types::{RunOutput, SimConfig, SimulationTrace, TraceEntry};

/// Simulation engine borrowing a dataset and owning a policy.
///
/// Generic over `P: ControlPolicy` for static dispatch. The engine itself is
/// immutable; per-run policy state lives on the stack of [`Engine::run`], so
/// one engine can be run any number of times with identical results.
#[derive(Debug)]
pub struct Engine<'d, P: ControlPolicy> {
    config: SimConfig,
    dataset: &'d Dataset,
    policy: P,
}

impl<'d, P: ControlPolicy> Engine<'d, P> {
    /// Creates an engine after checking `config` against `dataset`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if `config.hours` is zero or differs from
    /// the dataset length, or if the physical limit is not a positive number.
    pub fn new(config: SimConfig, dataset: &'d Dataset, policy: P) -> Result<Self> {
        if config.hours == 0 {
            return Err(DuelError::config("hours", "must be > 0"));
        }
        if config.hours != dataset.len() {
            return Err(DuelError::config(
                "hours",
                format!(
                    "dataset has {} hours but the run expects {}",
                    dataset.len(),
                    config.hours
                ),
            ));
        }
        if !(config.physical_max_draw_kw.is_finite() && config.physical_max_draw_kw > 0.0) {
            return Err(DuelError::config(
                "physical_max_draw_kw",
                "must be a finite number > 0",
            ));
        }
        Ok(Self {
            config,
            dataset,
            policy,
        })
    }

    /// Executes one hour and returns its trace entry and the next state.
    ///
    /// # Errors
    ///
    /// Returns `CausalityViolation` if the policy reads past `hour` or
    /// decides for another hour, and `ConfigurationError` if `hour` is out of
    /// range or the adjustment is not finite.
    pub fn step(&self, hour: usize, state: PolicyState) -> Result<(TraceEntry, PolicyState)> {
        let visible = self.dataset.records().get(..=hour).ok_or_else(|| {
            DuelError::config("hour", format!("{hour} is outside the dataset"))
        })?;
        let window = VisibleWindow::new(visible)?;

        let (decision, next_state) = self.policy.decide(hour, &window, state)?;
        if decision.hour_index != hour {
            return Err(DuelError::CausalityViolation {
                current: hour,
                requested: decision.hour_index,
            });
        }
        if !decision.adjustment_kw.is_finite() {
            return Err(DuelError::config(
                "adjustment_kw",
                format!(
                    "{} returned a non-finite adjustment at hour {hour}",
                    self.policy.strategy_id()
                ),
            ));
        }

        let record = window.current();
        let actual_draw_kw = (record.baseline_demand_kw + decision.adjustment_kw)
            .clamp(0.0, self.config.physical_max_draw_kw);
        let entry = TraceEntry {
            hour_index: hour,
            baseline_demand_kw: record.baseline_demand_kw,
            adjustment_kw: decision.adjustment_kw,
            actual_draw_kw,
            violation: !record.within_comfort(actual_draw_kw),
        };
        debug!(
            hour,
            draw = actual_draw_kw,
            violation = entry.violation,
            "simulated hour"
        );
        Ok((entry, next_state))
    }

    /// Runs every hour in order and seals the summary.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`Engine::step`]; no summary is
    /// produced in that case.
    pub fn run(&self) -> Result<RunOutput> {
        let strategy_id = self.policy.strategy_id();
        info!(
            seed = self.config.seed,
            hours = self.config.hours,
            strategy = strategy_id,
            "simulation started"
        );

        let mut clock = Clock::new(self.config.hours);
        let mut trace = SimulationTrace::with_capacity(self.config.hours);
        let mut state = self.policy.initial_state();
        while let Some(hour) = clock.tick() {
            let (entry, next_state) = self.step(hour, state)?;
            trace.push(entry);
            state = next_state;
        }

        let timestamp = match self.config.timestamp {
            Some(ts) => ts,
            None => self.scenario_end()?,
        };
        let summary = SummaryRecord::new(
            self.config.seed,
            self.config.hours,
            strategy_id,
            trace.mean_draw_kw(),
            trace.violation_count(),
            &timestamp,
        )?;

        info!(
            strategy = strategy_id,
            average_grid_draw_kw = summary.average_grid_draw_kw,
            comfort_violations = summary.comfort_violations,
            "simulation finished"
        );
        Ok(RunOutput { trace, summary })
    }

    /// Instant just after the last simulated hour.
    fn scenario_end(&self) -> Result<Timestamp> {
        let first = self
            .dataset
            .get(0)
            .ok_or_else(|| DuelError::config("dataset", "must contain at least one hour"))?;
        let start = Timestamp::parse(&first.timestamp)
            .map_err(|e| DuelError::config("dataset[0].timestamp", e.to_string()))?;
        start
            .plus_hours(self.config.hours as i64)
            .map_err(|e| DuelError::config("hours", e.to_string()))
    }

    /// The policy driving this engine.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Run configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

/// Builds an engine and runs it once.
///
/// # Errors
///
/// Returns any error from [`Engine::new`] or [`Engine::run`].
pub fn run<P: ControlPolicy>(config: SimConfig, dataset: &Dataset, policy: P) -> Result<RunOutput> {
    Engine::new(config, dataset, policy)?.run()
}

/// Runs independent engines in parallel. Results are in input order.
pub fn run_many<P: ControlPolicy + Sync>(engines: &[Engine<'_, P>]) -> Vec<Result<RunOutput>> {
    info!(runs = engines.len(), "running simulations in parallel");
    engines.par_iter().map(|engine| engine.run()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;
    use crate::dataset::generate;
    use crate::policy::{BaselinePolicy, ControlDecision, Policy};

    /// Reads one hour ahead on every decision after hour 0.
    struct PeekingPolicy;

    impl ControlPolicy for PeekingPolicy {
        fn strategy_id(&self) -> &str {
            "peeking"
        }

        fn initial_state(&self) -> PolicyState {
            PolicyState::Stateless
        }

        fn decide(
            &self,
            hour_index: usize,
            window: &VisibleWindow<'_>,
            state: PolicyState,
        ) -> Result<(ControlDecision, PolicyState)> {
            if hour_index > 0 {
                window.get(hour_index + 1)?;
            }
            Ok((ControlDecision::new(hour_index, 0.0), state))
        }
    }

    /// Issues every decision for the following hour.
    struct MislabelingPolicy;

    impl ControlPolicy for MislabelingPolicy {
        fn strategy_id(&self) -> &str {
            "mislabeling"
        }

        fn initial_state(&self) -> PolicyState {
            PolicyState::Stateless
        }

        fn decide(
            &self,
            hour_index: usize,
            _window: &VisibleWindow<'_>,
            state: PolicyState,
        ) -> Result<(ControlDecision, PolicyState)> {
            Ok((ControlDecision::new(hour_index + 1, 0.0), state))
        }
    }

    /// Constant adjustment, used to force clamping and violations.
    struct ConstantPolicy(f64);

    impl ControlPolicy for ConstantPolicy {
        fn strategy_id(&self) -> &str {
            "constant"
        }

        fn initial_state(&self) -> PolicyState {
            PolicyState::Stateless
        }

        fn decide(
            &self,
            hour_index: usize,
            _window: &VisibleWindow<'_>,
            state: PolicyState,
        ) -> Result<(ControlDecision, PolicyState)> {
            Ok((ControlDecision::new(hour_index, self.0), state))
        }
    }

    #[test]
    fn baseline_run_matches_dataset_mean() {
        let ds = generate(42, 72).unwrap();
        let out = run(SimConfig::new(42, 72), &ds, BaselinePolicy).unwrap();
        assert_eq!(out.trace.len(), 72);
        assert_eq!(out.summary.comfort_violations, 0);
        assert_eq!(out.summary.average_grid_draw_kw, out.trace.mean_draw_kw());
        assert!((out.summary.average_grid_draw_kw - 0.96).abs() < 1e-9);
        assert_eq!(out.summary.timestamp, "2025-09-20T00:00:00Z");
    }

    #[test]
    fn hours_mismatch_is_configuration_error() {
        let ds = generate(1, 24).unwrap();
        let err = Engine::new(SimConfig::new(1, 48), &ds, BaselinePolicy).unwrap_err();
        assert!(matches!(err, DuelError::Configuration(ref e) if e.field == "hours"));
    }

    #[test]
    fn bad_physical_limit_is_rejected() {
        let ds = generate(1, 24).unwrap();
        let mut cfg = SimConfig::new(1, 24);
        cfg.physical_max_draw_kw = f64::NAN;
        assert!(Engine::new(cfg, &ds, BaselinePolicy).is_err());
    }

    #[test]
    fn peeking_policy_fails_without_summary() {
        let ds = generate(3, 10).unwrap();
        let result = run(SimConfig::new(3, 10), &ds, PeekingPolicy);
        assert!(matches!(
            result,
            Err(DuelError::CausalityViolation {
                current: 1,
                requested: 2
            })
        ));
    }

    #[test]
    fn decision_for_another_hour_is_causality_violation() {
        let ds = generate(3, 10).unwrap();
        let result = run(SimConfig::new(3, 10), &ds, MislabelingPolicy);
        assert!(matches!(
            result,
            Err(DuelError::CausalityViolation {
                current: 0,
                requested: 1
            })
        ));
    }

    #[test]
    fn draw_is_clamped_and_violations_are_data() {
        let ds = generate(5, 24).unwrap();
        let mut cfg = SimConfig::new(5, 24);
        cfg.physical_max_draw_kw = 2.0;
        let out = run(cfg, &ds, ConstantPolicy(10.0)).unwrap();
        assert!(out.trace.entries().iter().all(|e| e.actual_draw_kw == 2.0));
        assert_eq!(out.summary.comfort_violations, 24);

        let out = run(SimConfig::new(5, 24), &ds, ConstantPolicy(-10.0)).unwrap();
        assert!(out.trace.entries().iter().all(|e| e.actual_draw_kw == 0.0));
        assert_eq!(out.summary.average_grid_draw_kw, 0.0);
    }

    #[test]
    fn non_finite_adjustment_is_rejected() {
        let ds = generate(5, 4).unwrap();
        let result = run(SimConfig::new(5, 4), &ds, ConstantPolicy(f64::INFINITY));
        assert!(matches!(result, Err(DuelError::Configuration(_))));
    }

    #[test]
    fn timestamp_override_is_used() {
        let ds = generate(5, 4).unwrap();
        let ts = Timestamp::parse("2030-01-01T00:00:00Z").unwrap();
        let out = run(SimConfig::new(5, 4).with_timestamp(ts), &ds, BaselinePolicy).unwrap();
        assert_eq!(out.summary.timestamp, "2030-01-01T00:00:00Z");
    }

    #[test]
    fn repeated_runs_are_identical() {
        let ds = generate(11, 48).unwrap();
        let cfg = ScenarioConfig::baseline();
        let policy = Policy::from_id("peak_shaving", &cfg).unwrap();
        let engine = Engine::new(SimConfig::new(11, 48), &ds, policy).unwrap();
        assert_eq!(engine.run().unwrap(), engine.run().unwrap());
    }

    #[test]
    fn run_many_matches_sequential_runs() {
        let cfg = ScenarioConfig::baseline();
        let datasets: Vec<_> = (0..4).map(|seed| generate(seed, 48).unwrap()).collect();
        let engines: Vec<_> = datasets
            .iter()
            .enumerate()
            .flat_map(|(seed, ds)| {
                ["baseline", "peak_shaving", "floor_tracking"].map(|id| {
                    let policy = Policy::from_id(id, &cfg).unwrap();
                    Engine::new(SimConfig::new(seed as u64, 48), ds, policy).unwrap()
                })
            })
            .collect();

        let parallel = run_many(&engines);
        assert_eq!(parallel.len(), engines.len());
        for (engine, result) in engines.iter().zip(parallel) {
            assert_eq!(result.unwrap(), engine.run().unwrap());
        }
    }

    #[test]
    fn optimizing_policies_stay_in_comfort_on_generated_data() {
        let cfg = ScenarioConfig::baseline();
        let ds = generate(42, 72).unwrap();
        for id in ["peak_shaving", "floor_tracking"] {
            let policy = Policy::from_id(id, &cfg).unwrap();
            let out = run(SimConfig::new(42, 72), &ds, policy).unwrap();
            assert_eq!(out.summary.comfort_violations, 0, "{id}");
            assert_eq!(out.summary.strategy_id, id);
        }
    }
}
