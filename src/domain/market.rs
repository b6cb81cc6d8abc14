use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Minimum number of daily bars the forecasting pipeline requires.
/// Shorter series short-circuit to the insufficient-data sentinel.
pub const MIN_HISTORY_ROWS: usize = 100;

/// A single daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Ordered daily price history for one symbol.
///
/// The constructor enforces the series invariants (ascending by date, no
/// duplicate dates); once built the series is immutable and is the source
/// of truth for every downstream computation in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<DailyBar>,
}

impl PriceSeries {
    /// Builds a series from bars in any order. Bars are sorted ascending by
    /// date and for duplicate dates the last occurrence wins.
    pub fn from_bars(mut bars: Vec<DailyBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by(|next, prev| {
            if next.date == prev.date {
                *prev = *next;
                true
            } else {
                false
            }
        });
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Whether the series is long enough to feed the forecasting pipeline.
    pub fn has_sufficient_history(&self) -> bool {
        self.bars.len() >= MIN_HISTORY_ROWS
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> Option<&DailyBar> {
        self.bars.last()
    }

    /// Open of the earliest bar, used as the listing-price reference.
    pub fn listing_price(&self) -> f64 {
        self.bars.first().map(|b| b.open).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> DailyBar {
        DailyBar {
            date: date.parse().unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000.0,
        }
    }

    #[test]
    fn test_from_bars_sorts_ascending() {
        let series = PriceSeries::from_bars(vec![
            bar("2024-01-03", 3.0),
            bar("2024-01-01", 1.0),
            bar("2024-01-02", 2.0),
        ]);
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_bars_dedups_dates_last_wins() {
        let series = PriceSeries::from_bars(vec![
            bar("2024-01-01", 1.0),
            bar("2024-01-01", 9.0),
            bar("2024-01-02", 2.0),
        ]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes()[0], 9.0);
    }

    #[test]
    fn test_listing_price_is_first_open() {
        let series = PriceSeries::from_bars(vec![bar("2024-01-02", 2.0), bar("2024-01-01", 1.0)]);
        assert_eq!(series.listing_price(), 1.0);
        assert_eq!(PriceSeries::from_bars(vec![]).listing_price(), 0.0);
    }

    #[test]
    fn test_sufficient_history_threshold() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let make = |n: usize| {
            PriceSeries::from_bars(
                (0..n)
                    .map(|i| DailyBar {
                        date: start + chrono::Duration::days(i as i64),
                        open: 100.0,
                        high: 100.0,
                        low: 100.0,
                        close: 100.0,
                        volume: 1_000.0,
                    })
                    .collect(),
            )
        };
        assert!(!make(99).has_sufficient_history());
        assert!(make(100).has_sufficient_history());
    }
}
