use crate::error::Result;

use super::{ControlDecision, ControlPolicy, PolicyState, VisibleWindow};

/// Passthrough policy: the grid draw is always the baseline demand.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BaselinePolicy;

impl ControlPolicy for BaselinePolicy {
    fn strategy_id(&self) -> &str {
        "baseline"
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
        Ok((ControlDecision::new(hour_index, 0.0), state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::test_support::hour;

    #[test]
    fn never_adjusts() {
        let records: Vec<_> = (0..3).map(|i| hour(i, 1.0 + i as f64, 0.2)).collect();
        let policy = BaselinePolicy;
        let mut state = policy.initial_state();
        for h in 0..3 {
            let window = VisibleWindow::new(&records[..=h]).unwrap();
            let (decision, next) = policy.decide(h, &window, state).unwrap();
            assert_eq!(decision, ControlDecision::new(h, 0.0));
            state = next;
        }
        assert_eq!(state, PolicyState::Stateless);
    }
}
