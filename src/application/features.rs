//! Feature engineering over daily price history.
//!
//! All indicators use trailing rolling windows over the close, so the
//! first `WARMUP_ROWS` rows of any series never produce a feature row.
//! The RSI here is the rolling-mean variant (mean gain / mean loss over
//! 14 periods), not the Wilder-smoothed one the `ta` crate ships, which
//! is why it is computed by hand.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::domain::market::PriceSeries;

const MA_SHORT: usize = 5;
const MA_LONG: usize = 20;
const RSI_PERIOD: usize = 14;
const BB_STD_MULT: f64 = 2.0;

/// Rows consumed before the longest rolling window (20 days) is full.
pub const WARMUP_ROWS: usize = MA_LONG - 1;

/// RSI reported for a window with neither gains nor losses.
pub const RSI_NEUTRAL: f64 = 50.0;

/// Column order every model is trained with. The forecast simulator must
/// assemble its rows in exactly this order.
pub const FEATURE_COLUMNS: [&str; 9] = [
    "date_ord", "ma_5", "ma_20", "rsi", "bb_upper", "bb_lower", "lag_1", "lag_2", "lag_5",
];

/// One fully-populated feature row, keyed by date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub date_ord: f64,
    pub ma_5: f64,
    pub ma_20: f64,
    pub rsi: f64,
    pub bb_upper: f64,
    pub bb_lower: f64,
    pub lag_1: f64,
    pub lag_2: f64,
    pub lag_5: f64,
    pub close: f64,
}

impl FeatureRow {
    /// Predictor vector in `FEATURE_COLUMNS` order.
    pub fn features(&self) -> Vec<f64> {
        vec![
            self.date_ord,
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

/// Feature rows aligned 1:1 with the surviving price rows, ascending by
/// date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    /// Predictor matrix for the given row range.
    pub fn matrix(&self, range: std::ops::Range<usize>) -> Vec<Vec<f64>> {
        self.rows[range].iter().map(|r| r.features()).collect()
    }

    /// Target vector (close) for the given row range.
    pub fn targets(&self, range: std::ops::Range<usize>) -> Vec<f64> {
        self.rows[range].iter().map(|r| r.close).collect()
    }
}

/// Derives the full feature table for a series.
///
/// Exactly the first `WARMUP_ROWS` rows are dropped; every later row is
/// fully populated. A flat window yields the neutral RSI rather than a
/// dropped row, and a loss-free window saturates at 100.
pub fn derive_features(series: &PriceSeries) -> FeatureTable {
    let bars = series.bars();
    let closes = series.closes();
    let n = closes.len();
    if n <= WARMUP_ROWS {
        return FeatureTable::default();
    }

    let mut rows = Vec::with_capacity(n - WARMUP_ROWS);
    for i in WARMUP_ROWS..n {
        let long_window = &closes[i + 1 - MA_LONG..=i];
        let ma_20 = long_window.mean();
        let std_20 = long_window.std_dev();
        let ma_5 = closes[i + 1 - MA_SHORT..=i].mean();

        let mut gain_sum = 0.0;
        let mut loss_sum = 0.0;
        for j in i + 1 - RSI_PERIOD..=i {
            let delta = closes[j] - closes[j - 1];
            if delta > 0.0 {
                gain_sum += delta;
            } else {
                loss_sum -= delta;
            }
        }
        let rsi = if loss_sum > 0.0 {
            let rs = gain_sum / loss_sum;
            100.0 - 100.0 / (1.0 + rs)
        } else if gain_sum > 0.0 {
            100.0
        } else {
            RSI_NEUTRAL
        };

        rows.push(FeatureRow {
            date: bars[i].date,
            date_ord: bars[i].date.num_days_from_ce() as f64,
            ma_5,
            ma_20,
            rsi,
            bb_upper: ma_20 + BB_STD_MULT * std_20,
            bb_lower: ma_20 - BB_STD_MULT * std_20,
            lag_1: closes[i - 1],
            lag_2: closes[i - 2],
            lag_5: closes[i - 5],
            close: closes[i],
        });
    }

    FeatureTable { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::DailyBar;
    use chrono::Duration;

    fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries::from_bars(
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| DailyBar {
                    date: start + Duration::days(i as i64),
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 10_000.0,
                })
                .collect(),
        )
    }

    #[test]
    fn test_warmup_rows_are_dropped_exactly() {
        let closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let table = derive_features(&series_from_closes(&closes));
        assert_eq!(table.len(), 25 - WARMUP_ROWS);

        let table = derive_features(&series_from_closes(&closes[..20]));
        assert_eq!(table.len(), 1);

        let table = derive_features(&series_from_closes(&closes[..19]));
        assert!(table.is_empty());
    }

    #[test]
    fn test_lags_and_moving_averages() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let table = derive_features(&series_from_closes(&closes));
        let row = &table.rows()[0]; // price index 19, close 119
        assert_eq!(row.close, 119.0);
        assert_eq!(row.lag_1, 118.0);
        assert_eq!(row.lag_2, 117.0);
        assert_eq!(row.lag_5, 114.0);
        // means of the 5 and 20 trailing closes of a unit ramp
        assert!((row.ma_5 - 117.0).abs() < 1e-12);
        assert!((row.ma_20 - 109.5).abs() < 1e-12);
    }

    #[test]
    fn test_rsi_saturates_on_pure_uptrend() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let table = derive_features(&series_from_closes(&closes));
        for row in table.rows() {
            assert_eq!(row.rsi, 100.0);
        }
    }

    #[test]
    fn test_rsi_neutral_on_flat_series_no_crash() {
        let closes = vec![100.0; 40];
        let table = derive_features(&series_from_closes(&closes));
        assert_eq!(table.len(), 40 - WARMUP_ROWS);
        for row in table.rows() {
            assert_eq!(row.rsi, RSI_NEUTRAL);
            // zero variance collapses the bands onto the moving average
            assert_eq!(row.bb_upper, 100.0);
            assert_eq!(row.bb_lower, 100.0);
        }
    }

    #[test]
    fn test_bollinger_uses_sample_std_dev() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let table = derive_features(&series_from_closes(&closes));
        let row = &table.rows()[0];
        // sample std dev of 0..20 ramp is sqrt(35) = 5.9160...
        let expected = 35.0_f64.sqrt();
        assert!((row.bb_upper - (row.ma_20 + 2.0 * expected)).abs() < 1e-9);
        assert!((row.bb_lower - (row.ma_20 - 2.0 * expected)).abs() < 1e-9);
    }

    #[test]
    fn test_feature_vector_order_matches_columns() {
        let closes: Vec<f64> = (0..21).map(|i| 100.0 + i as f64).collect();
        let table = derive_features(&series_from_closes(&closes));
        let row = &table.rows()[0];
        let v = row.features();
        assert_eq!(v.len(), FEATURE_COLUMNS.len());
        assert_eq!(v[0], row.date_ord);
        assert_eq!(v[6], row.lag_1);
        assert_eq!(v[8], row.lag_5);
    }
}
