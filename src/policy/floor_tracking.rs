use tracing::debug;

use crate::config::FloorTrackingConfig;
use crate::error::Result;

use super::{
    ControlDecision, ControlPolicy, PolicyState, VisibleWindow, comfort_adjustment_range,
    state_mismatch,
};

/// Adjustment applied in the previous hour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampState {
    /// Previous hour's adjustment (kW); `0.0` before hour 0.
    pub previous_adjustment_kw: f64,
}

/// Drives the draw down toward `comfort_bound_low + headroom_kw`.
///
/// The adjustment may move at most `ramp_limit_kw` per hour. If the ramped
/// value would leave the comfort band it is pulled back inside, so comfort
/// takes precedence over the ramp limit.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorTrackingPolicy {
    config: FloorTrackingConfig,
}

impl FloorTrackingPolicy {
    /// Creates the policy. `config` is expected to have passed validation.
    pub fn new(config: FloorTrackingConfig) -> Self {
        Self { config }
    }
}

impl ControlPolicy for FloorTrackingPolicy {
    fn strategy_id(&self) -> &str {
        "floor_tracking"
    }

    fn initial_state(&self) -> PolicyState {
        PolicyState::Ramp(RampState {
            previous_adjustment_kw: 0.0,
        })
    }

    fn decide(
        &self,
        hour_index: usize,
        window: &VisibleWindow<'_>,
        state: PolicyState,
    ) -> Result<(ControlDecision, PolicyState)> {
        let PolicyState::Ramp(ramp) = state else {
            return Err(state_mismatch(self.strategy_id()));
        };
        let current = window.get(hour_index)?;
        let (lo, hi) = comfort_adjustment_range(current);

        let target = (current.comfort_bound_low + self.config.headroom_kw
            - current.baseline_demand_kw)
            .max(lo)
            .min(hi);
        let previous = ramp.previous_adjustment_kw;
        let ramped = target
            .max(previous - self.config.ramp_limit_kw)
            .min(previous + self.config.ramp_limit_kw);
        let adjustment_kw = ramped.max(lo).min(hi);

        debug!(hour = hour_index, target, previous, adjustment_kw, "floor tracking decision");

        Ok((
            ControlDecision::new(hour_index, adjustment_kw),
            PolicyState::Ramp(RampState {
                previous_adjustment_kw: adjustment_kw,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::test_support::hour;

    fn policy() -> FloorTrackingPolicy {
        FloorTrackingPolicy::new(FloorTrackingConfig {
            ramp_limit_kw: 0.1,
            headroom_kw: 0.0,
        })
    }

    fn run(records: &[crate::dataset::HourRecord]) -> Vec<f64> {
        let p = policy();
        let mut state = p.initial_state();
        let mut out = Vec::new();
        for h in 0..records.len() {
            let window = VisibleWindow::new(&records[..=h]).unwrap();
            let (decision, next) = p.decide(h, &window, state).unwrap();
            out.push(decision.adjustment_kw);
            state = next;
        }
        out
    }

    #[test]
    fn ramps_down_toward_floor() {
        let records: Vec<_> = (0..4).map(|i| hour(i, 1.0, 0.25)).collect();
        let adj = run(&records);
        assert!((adj[0] + 0.1).abs() < 1e-9);
        assert!((adj[1] + 0.2).abs() < 1e-9);
        // floor reached (minus the inset)
        assert!((adj[2] + 0.25).abs() < 1e-6);
        assert!((adj[3] + 0.25).abs() < 1e-6);
    }

    #[test]
    fn consecutive_changes_respect_ramp_when_band_allows() {
        let records: Vec<_> = (0..6).map(|i| hour(i, 1.0, 0.5)).collect();
        let adj = run(&records);
        let mut prev = 0.0;
        for a in adj {
            assert!((a - prev).abs() <= 0.1 + 1e-12);
            prev = a;
        }
    }

    #[test]
    fn comfort_overrides_ramp() {
        // After ramping down, hour 3 needs +0.2 kW; the ramp only allows 0.0.
        let mut records: Vec<_> = (0..4).map(|i| hour(i, 1.0, 0.1)).collect();
        records[3].baseline_demand_kw = 0.5;
        records[3].comfort_bound_low = 0.7;
        records[3].comfort_bound_high = 0.8;
        let adj = run(&records);
        for (r, a) in records.iter().zip(&adj) {
            assert!(r.within_comfort(r.baseline_demand_kw + a), "hour {}", r.index);
        }
        assert!(adj[3] - adj[2] > 0.1);
    }

    #[test]
    fn foreign_state_is_rejected() {
        let records = vec![hour(0, 1.0, 0.3)];
        let p = policy();
        let window = VisibleWindow::new(&records).unwrap();
        assert!(p.decide(0, &window, PolicyState::Stateless).is_err());
    }
}
