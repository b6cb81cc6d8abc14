use serde::{Deserialize, Serialize};

use crate::application::models::ModelSpec;

/// Hard ceiling on the projection horizon. Each simulated step feeds the
/// next, so error compounds quickly past a few weeks.
pub const MAX_HORIZON_DAYS: usize = 30;

/// Configuration for one forecasting run.
///
/// The candidate list is explicit configuration rather than a module-level
/// registry so tests can inject reduced or synthetic candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Number of calendar days to project forward, clamped to
    /// `1..=MAX_HORIZON_DAYS`.
    pub horizon: usize,
    /// Candidates fitted and compared on each run, in evaluation order.
    /// Ties on the selection metric go to the earlier entry.
    pub candidates: Vec<ModelSpec>,
}

impl ForecastConfig {
    pub fn new(horizon: usize) -> Self {
        Self {
            horizon: horizon.clamp(1, MAX_HORIZON_DAYS),
            candidates: ModelSpec::default_candidates(),
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<ModelSpec>) -> Self {
        self.candidates = candidates;
        self
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self::new(MAX_HORIZON_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizon_is_clamped() {
        assert_eq!(ForecastConfig::new(0).horizon, 1);
        assert_eq!(ForecastConfig::new(7).horizon, 7);
        assert_eq!(ForecastConfig::new(365).horizon, MAX_HORIZON_DAYS);
    }

    #[test]
    fn test_default_candidate_order() {
        let config = ForecastConfig::default();
        let names: Vec<&str> = config
            .candidates
            .iter()
            .map(|c| c.display_name())
            .collect();
        assert_eq!(
            names,
            vec!["Ridge Regression", "Random Forest", "Gradient Boosting"]
        );
    }
}
