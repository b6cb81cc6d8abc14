//! Qualitative buy/hold/sell verdict from technicals, growth and
//! valuation.

use serde::{Deserialize, Serialize};
use ta::indicators::SimpleMovingAverage;
use ta::Next;

use crate::domain::financials::GrowthMetrics;
use crate::domain::market::PriceSeries;

const TREND_SMA_PERIOD: usize = 50;
const REVENUE_GROWTH_BAR: f64 = 10.0;
const PE_CEILING: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Buy,
    Hold,
    Sell,
}

impl Rating {
    pub fn label(&self) -> &'static str {
        match self {
            Rating::Buy => "ACCUMULATE / BUY",
            Rating::Hold => "HOLD",
            Rating::Sell => "REDUCE / SELL",
        }
    }

    pub fn color_hex(&self) -> &'static str {
        match self {
            Rating::Buy => "#10b981",
            Rating::Hold => "#eab308",
            Rating::Sell => "#ef4444",
        }
    }

    pub fn action_phrase(&self) -> &'static str {
        match self {
            Rating::Buy => "considering accumulating positions on dips",
            Rating::Hold => "maintaining current exposure while awaiting clearer signals",
            Rating::Sell => "reducing exposure or waiting for a deeper correction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub rating: Rating,
    pub score: i32,
    pub summary: String,
}

/// Scores three signals, one point each: price above its 50-day average,
/// revenue growth above 10%, and a trailing P/E between 0 and 60.
pub fn generate_verdict(series: &PriceSeries, growth: &GrowthMetrics, trailing_pe: f64) -> Verdict {
    let current = series.last().map(|b| b.close).unwrap_or(0.0);
    let ma_50 = trailing_sma(series, TREND_SMA_PERIOD);
    let revenue_growth = growth.revenue.map(|g| g.pct_change).unwrap_or(0.0);

    let above_trend = current > ma_50;
    let growing = revenue_growth > REVENUE_GROWTH_BAR;
    let fairly_valued = trailing_pe > 0.0 && trailing_pe < PE_CEILING;

    let score = above_trend as i32 + growing as i32 + fairly_valued as i32;
    // the additive score never goes negative, so Hold is the floor
    let rating = if score >= 2 { Rating::Buy } else { Rating::Hold };

    let summary = format!(
        "Technical momentum: trading {} its 50-day moving average, indicating {}. \
         Fundamental trajectory: {} revenue trend ({:+.1}%), reflecting the company's ability to {}. \
         Valuation: P/E of {:.1} suggests the stock is {}. \
         Overall recommendation: {}. Investors are advised to proceed by {}.",
        if above_trend { "above" } else { "below" },
        if above_trend {
            "favorable short-term momentum"
        } else {
            "short-term technical weakness"
        },
        if revenue_growth > 0.0 { "robust" } else { "subdued" },
        revenue_growth,
        if revenue_growth > 0.0 {
            "capture market share"
        } else {
            "navigate demand headwinds"
        },
        trailing_pe,
        if fairly_valued || trailing_pe <= 0.0 {
            "reasonably valued"
        } else {
            "trading at a premium"
        },
        rating.label(),
        rating.action_phrase(),
    );

    Verdict {
        rating,
        score,
        summary,
    }
}

/// Trailing simple moving average of the close; over the warmup stretch
/// the `ta` SMA averages whatever it has seen so far.
fn trailing_sma(series: &PriceSeries, period: usize) -> f64 {
    let mut sma = match SimpleMovingAverage::new(period) {
        Ok(sma) => sma,
        Err(_) => return 0.0,
    };
    let mut last = 0.0;
    for bar in series.bars() {
        last = sma.next(bar.close);
    }
    last
}
