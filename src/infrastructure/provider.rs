//! Price history acquisition.
//!
//! The pipeline only ever sees a `PriceSeries`; where it comes from is an
//! adapter concern. Absence or failure is an error, distinct from an
//! empty-but-valid series.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::domain::errors::MarketDataError;
use crate::domain::market::{DailyBar, PriceSeries};

pub trait PriceHistoryProvider {
    /// Full ascending daily history for `symbol`.
    fn fetch_history(&self, symbol: &str) -> Result<PriceSeries, MarketDataError>;
}

/// Reads daily bars from a local CSV export with a
/// `date,open,high,low,close,volume` header and ISO dates.
pub struct CsvPriceHistory {
    base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct BarRecord {
    date: chrono::NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl CsvPriceHistory {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn read_file(path: &Path) -> Result<PriceSeries, MarketDataError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| match e.kind() {
            csv::ErrorKind::Io(_) => MarketDataError::NotFound {
                symbol: path.display().to_string(),
            },
            _ => MarketDataError::Malformed {
                reason: e.to_string(),
            },
        })?;

        let mut bars = Vec::new();
        for record in reader.deserialize() {
            let record: BarRecord = record.map_err(|e| MarketDataError::Malformed {
                reason: e.to_string(),
            })?;
            bars.push(DailyBar {
                date: record.date,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
            });
        }
        Ok(PriceSeries::from_bars(bars))
    }
}

impl PriceHistoryProvider for CsvPriceHistory {
    fn fetch_history(&self, symbol: &str) -> Result<PriceSeries, MarketDataError> {
        let path = self.base_dir.join(format!("{symbol}.csv"));
        if !path.exists() {
            return Err(MarketDataError::NotFound {
                symbol: symbol.to_string(),
            });
        }
        let series = Self::read_file(&path)?;
        info!(symbol, rows = series.len(), "loaded price history");
        Ok(series)
    }
}
