//! The forecasting pipeline: feature derivation, ensemble training and
//! selection, iterative multi-step projection, and retrospective backtest
//! checkpoints.
//!
//! The whole pipeline is fail-soft. Short history returns the sentinel
//! outcome, model failures degrade to the sentinel with a warning, and
//! backtest checkpoints without enough trailing history are omitted
//! silently. Nothing in here panics on caller input.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::application::features::{derive_features, FeatureRow, FeatureTable};
use crate::application::models::{train_and_select, CandidateScore, ModelSpec, TrainedModel};
use crate::config::ForecastConfig;
use crate::domain::errors::ModelError;
use crate::domain::market::PriceSeries;
use crate::domain::metrics::RegressionReport;

/// Model name carried by the sentinel outcome.
pub const INSUFFICIENT_DATA: &str = "Insufficient Data";

/// Fixed backtest checkpoints: display label and trading-row gap back from
/// the most recent row.
pub const CHECKPOINTS: [(&str, usize); 4] = [
    ("Today", 0),
    ("Yesterday", 1),
    ("Last Week", 7),
    ("Last Month", 30),
];

/// Extra trailing rows a checkpoint needs before its anchor to be worth
/// retraining on.
const CHECKPOINT_MARGIN: usize = 50;

/// One projected future price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// One backtest checkpoint: what actually happened at the anchor versus
/// what a freshly trained model would have predicted for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealityCheckEntry {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutcome {
    /// Final projected price, i.e. the last point of the sequence.
    pub target_price: f64,
    pub points: Vec<ForecastPoint>,
    /// Held-out metrics of the winning candidate. `None` on the sentinel.
    pub metrics: Option<RegressionReport>,
    pub reality_check: BTreeMap<String, RealityCheckEntry>,
    pub comparison: Vec<CandidateScore>,
    pub model_name: String,
}

impl ForecastOutcome {
    /// Sentinel returned when the series is too short (or training fails):
    /// zero target, empty sequences and maps, sentinel model name.
    pub fn insufficient_data() -> Self {
        Self {
            target_price: 0.0,
            points: Vec::new(),
            metrics: None,
            reality_check: BTreeMap::new(),
            comparison: Vec::new(),
            model_name: INSUFFICIENT_DATA.to_string(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.model_name == INSUFFICIENT_DATA
    }
}

/// Recurrent state of the forecast simulator.
///
/// Only the close, the lag chain and the 5-day average advance as the
/// simulation walks forward. MA-20, RSI and the Bollinger bands stay
/// frozen at their last observed values: recomputing them would need a
/// full rolling window of synthetic prices, and changing that would
/// silently change every forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationState {
    pub date: NaiveDate,
    pub close: f64,
    pub lag_1: f64,
    pub lag_2: f64,
    pub lag_5: f64,
    pub ma_5: f64,
    pub ma_20: f64,
    pub bb_upper: f64,
    pub bb_lower: f64,
    pub rsi: f64,
}

impl SimulationState {
    /// Seeds the simulator from the last real feature row. The lag chain
    /// starts one step ahead of the row: today's close becomes lag 1 and
    /// the row's lag 1 becomes lag 2.
    pub fn from_last_row(row: &FeatureRow) -> Self {
        Self {
            date: row.date,
            close: row.close,
            lag_1: row.close,
            lag_2: row.lag_1,
            lag_5: row.lag_5,
            ma_5: row.ma_5,
            ma_20: row.ma_20,
            bb_upper: row.bb_upper,
            bb_lower: row.bb_lower,
            rsi: row.rsi,
        }
    }

    fn features(&self) -> Vec<f64> {
        // must mirror FEATURE_COLUMNS order exactly
        vec![
            self.date.num_days_from_ce() as f64,
            self.ma_5,
            self.ma_20,
            self.rsi,
            self.bb_upper,
            self.bb_lower,
            self.lag_1,
            self.lag_2,
            self.lag_5,
        ]
    }
}

/// Projects `horizon` daily closes forward, feeding each prediction back
/// into the next step's lags and blended 5-day average.
///
/// Dates advance by one calendar day with no trading-calendar awareness;
/// weekends and holidays are not skipped.
pub fn simulate(
    model: &TrainedModel,
    mut state: SimulationState,
    horizon: usize,
) -> Result<Vec<ForecastPoint>, ModelError> {
    let mut points = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        state.date += Duration::days(1);
        let predicted = model.predict_row(&state.features())?;
        points.push(ForecastPoint {
            date: state.date,
            close: predicted,
        });

        state.lag_5 = state.lag_2;
        state.lag_2 = state.lag_1;
        state.lag_1 = predicted;
        // exponential proxy for the rolling mean; a true 5-day window is
        // not available over simulated prices
        state.ma_5 = (state.ma_5 * 4.0 + predicted) / 5.0;
        state.close = predicted;
    }
    Ok(points)
}

/// Re-trains a fresh, lighter model of the winning family on history
/// truncated strictly before each checkpoint anchor and predicts the
/// anchor's close from its own feature row.
///
/// Checkpoints whose anchor lacks `CHECKPOINT_MARGIN` trailing rows are
/// omitted from the map, never reported as errors.
pub fn reality_check(
    table: &FeatureTable,
    winner: ModelSpec,
) -> BTreeMap<String, RealityCheckEntry> {
    use smartcore::linalg::basic::matrix::DenseMatrix;

    let n = table.len();
    let spec = winner.backtest_variant();
    let mut entries = BTreeMap::new();

    for (label, gap) in CHECKPOINTS {
        if n <= gap + 1 + CHECKPOINT_MARGIN {
            continue;
        }
        let anchor = n - 1 - gap;
        let target = &table.rows()[anchor];

        let x = match DenseMatrix::from_2d_vec(&table.matrix(0..anchor)) {
            Ok(m) => m,
            Err(e) => {
                warn!(label, "backtest matrix build failed: {}", e);
                continue;
            }
        };
        let y = table.targets(0..anchor);
        let predicted = spec
            .fit(&x, &y)
            .and_then(|model| model.predict_row(&target.features()));
        match predicted {
            Ok(predicted) => {
                entries.insert(
                    label.to_string(),
                    RealityCheckEntry {
                        date: target.date,
                        actual: target.close,
                        predicted,
                    },
                );
            }
            Err(e) => warn!(label, "backtest checkpoint skipped: {}", e),
        }
    }
    entries
}

/// Forecast entry point: derives features, trains and selects the
/// ensemble, projects the horizon forward and reconstructs the backtest
/// checkpoints.
///
/// Series shorter than the 100-row minimum short-circuit to the sentinel
/// without fitting anything.
pub fn run_ensemble_forecast(series: &PriceSeries, config: &ForecastConfig) -> ForecastOutcome {
    if !series.has_sufficient_history() {
        info!(
            rows = series.len(),
            "insufficient price history, returning sentinel"
        );
        return ForecastOutcome::insufficient_data();
    }

    let table = derive_features(series);
    let selection = match train_and_select(&table, &config.candidates) {
        Ok(s) => s,
        Err(e) => {
            warn!("model training failed, returning sentinel: {}", e);
            return ForecastOutcome::insufficient_data();
        }
    };
    info!(
        model = %selection.name,
        rmse = selection.report.rmse,
        r2 = selection.report.r2,
        "selected forecast model"
    );

    let last_row = match table.last() {
        Some(row) => *row,
        None => return ForecastOutcome::insufficient_data(),
    };
    let points = match simulate(
        &selection.model,
        SimulationState::from_last_row(&last_row),
        config.horizon,
    ) {
        Ok(p) => p,
        Err(e) => {
            warn!("forecast simulation failed, returning sentinel: {}", e);
            return ForecastOutcome::insufficient_data();
        }
    };

    let reality_check = reality_check(&table, selection.spec);
    let target_price = points.last().map(|p| p.close).unwrap_or(0.0);

    ForecastOutcome {
        target_price,
        points,
        metrics: Some(selection.report),
        reality_check,
        comparison: selection.comparison,
        model_name: selection.name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::DailyBar;

    fn ramp_series(n: usize, step: f64) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        PriceSeries::from_bars(
            (0..n)
                .map(|i| {
                    let close = 100.0 + step * i as f64;
                    DailyBar {
                        date: start + Duration::days(i as i64),
                        open: close,
                        high: close,
                        low: close,
                        close,
                        volume: 10_000.0,
                    }
                })
                .collect(),
        )
    }

    #[test]
    fn test_simulation_state_seed_shifts_lag_chain() {
        let table = derive_features(&ramp_series(40, 1.0));
        let last = table.last().unwrap();
        let state = SimulationState::from_last_row(last);
        assert_eq!(state.lag_1, last.close);
        assert_eq!(state.lag_2, last.lag_1);
        assert_eq!(state.lag_5, last.lag_5);
        assert_eq!(state.date, last.date);
    }

    #[test]
    fn test_reality_check_margin_boundary() {
        // usable rows must exceed gap + 51 for a checkpoint to appear
        let spec = ModelSpec::Ridge { alpha: 1.0 };

        // 71 bars -> 52 usable rows: "Today" (gap 0) needs > 51, included;
        // "Yesterday" (gap 1) needs > 52, omitted
        let table = derive_features(&ramp_series(71, 0.5));
        assert_eq!(table.len(), 52);
        let entries = reality_check(&table, spec);
        assert!(entries.contains_key("Today"));
        assert!(!entries.contains_key("Yesterday"));

        // one more bar brings "Yesterday" in
        let table = derive_features(&ramp_series(72, 0.5));
        let entries = reality_check(&table, spec);
        assert!(entries.contains_key("Yesterday"));
        assert!(!entries.contains_key("Last Week"));
    }

    #[test]
    fn test_reality_check_anchors_and_accuracy() {
        let table = derive_features(&ramp_series(300, 0.5));
        let entries = reality_check(&table, ModelSpec::Ridge { alpha: 1.0 });
        assert_eq!(entries.len(), 4);
        let n = table.len();
        for (label, gap) in CHECKPOINTS {
            let entry = &entries[label];
            let anchor = &table.rows()[n - 1 - gap];
            assert_eq!(entry.date, anchor.date);
            assert_eq!(entry.actual, anchor.close);
            // ridge on a clean ramp reconstructs the anchor almost exactly
            assert!((entry.predicted - entry.actual).abs() < 1.0);
        }
    }

    #[test]
    fn test_sentinel_below_minimum_history() {
        let outcome = run_ensemble_forecast(&ramp_series(99, 0.5), &ForecastConfig::new(10));
        assert!(outcome.is_sentinel());
        assert_eq!(outcome.target_price, 0.0);
        assert!(outcome.points.is_empty());
        assert!(outcome.metrics.is_none());
        assert!(outcome.reality_check.is_empty());
        assert!(outcome.comparison.is_empty());
    }
}
