use tracing::debug;

use crate::config::PeakShavingConfig;
use crate::error::Result;

use super::{
    ControlDecision, ControlPolicy, PolicyState, VisibleWindow, comfort_adjustment_range,
    state_mismatch,
};

/// Energy held by the virtual battery between hours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageState {
    /// Stored energy (kWh), within `[0, capacity_kwh]`.
    pub stored_kwh: f64,
}

/// Virtual battery that flattens demand toward its trailing mean.
///
/// Each hour the target draw is the mean baseline demand over the last
/// `lookback_hours` visible records, clamped into the current hour's comfort
/// band. The battery charges (positive adjustment) when demand is below the
/// target and discharges when above, limited by power rating and stored
/// energy. Hours are one hour long, so kW and kWh per step coincide.
///
/// # Power Convention
/// - Positive adjustment: charging (extra draw from the grid)
/// - Negative adjustment: discharging (draw served from storage)
#[derive(Debug, Clone, PartialEq)]
pub struct PeakShavingPolicy {
    config: PeakShavingConfig,
}

impl PeakShavingPolicy {
    /// Creates the policy. `config` is expected to have passed validation.
    pub fn new(config: PeakShavingConfig) -> Self {
        Self { config }
    }

    /// Storage parameters.
    pub fn config(&self) -> &PeakShavingConfig {
        &self.config
    }

    /// Applies power and energy limits to `setpoint_kw` and returns the
    /// achievable adjustment with the resulting storage level.
    fn apply_setpoint(&self, setpoint_kw: f64, stored_kwh: f64) -> (f64, f64) {
        let c = &self.config;
        if setpoint_kw > 0.0 {
            let headroom_kwh = (c.capacity_kwh - stored_kwh).max(0.0);
            let actual = setpoint_kw.min(c.max_charge_kw).min(headroom_kwh / c.eta_charge);
            let stored = (stored_kwh + actual * c.eta_charge).clamp(0.0, c.capacity_kwh);
            (actual, stored)
        } else if setpoint_kw < 0.0 {
            let available_kw = stored_kwh.max(0.0) * c.eta_discharge;
            let actual = (-setpoint_kw).min(c.max_discharge_kw).min(available_kw);
            let stored = (stored_kwh - actual / c.eta_discharge).clamp(0.0, c.capacity_kwh);
            (-actual, stored)
        } else {
            (0.0, stored_kwh)
        }
    }
}

impl ControlPolicy for PeakShavingPolicy {
    fn strategy_id(&self) -> &str {
        "peak_shaving"
    }

    fn initial_state(&self) -> PolicyState {
        PolicyState::Storage(StorageState {
            stored_kwh: self.config.capacity_kwh * self.config.initial_soc,
        })
    }

    fn decide(
        &self,
        hour_index: usize,
        window: &VisibleWindow<'_>,
        state: PolicyState,
    ) -> Result<(ControlDecision, PolicyState)> {
        let PolicyState::Storage(storage) = state else {
            return Err(state_mismatch(self.strategy_id()));
        };
        let current = window.get(hour_index)?;

        let history = window.trailing(self.config.lookback_hours);
        let trailing_mean =
            history.iter().map(|r| r.baseline_demand_kw).sum::<f64>() / history.len() as f64;

        let (lo, hi) = comfort_adjustment_range(current);
        let setpoint = (trailing_mean - current.baseline_demand_kw).clamp(lo.min(hi), hi.max(lo));
        let (adjustment_kw, stored_kwh) = self.apply_setpoint(setpoint, storage.stored_kwh);

        debug!(
            hour = hour_index,
            trailing_mean,
            setpoint,
            adjustment_kw,
            stored_kwh,
            "peak shaving decision"
        );

        Ok((
            ControlDecision::new(hour_index, adjustment_kw),
            PolicyState::Storage(StorageState { stored_kwh }),
        ))
    }
}
