//! Sparse financial statement tables and the extraction helpers built on
//! top of them.
//!
//! Statement exports are inconsistent about line-item wording, so every
//! lookup goes through fuzzy case-insensitive substring matching against a
//! keyword list. Extraction never fails: a label that cannot be matched
//! yields a zero or an absent record, which display logic treats as
//! "no data" rather than an error.

use serde::{Deserialize, Serialize};

/// One line item: a trimmed label plus one value per period column.
/// Missing or unparseable cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// A sparse numeric table keyed by line-item label and period column,
/// oldest period first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    periods: Vec<String>,
    rows: Vec<StatementRow>,
}

impl StatementTable {
    pub fn new(periods: Vec<String>) -> Self {
        Self {
            periods,
            rows: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    pub fn rows(&self) -> &[StatementRow] {
        &self.rows
    }

    pub fn push_row(&mut self, label: impl Into<String>, values: Vec<Option<f64>>) {
        self.rows.push(StatementRow {
            label: label.into(),
            values,
        });
    }

    /// Latest non-zero value of the first row whose label contains any of
    /// the keywords (case-insensitive). Periods are scanned newest-first.
    /// Returns 0.0 when nothing matches.
    pub fn latest_value(&self, keywords: &[&str]) -> f64 {
        for row in self.matching_rows(keywords, &[]) {
            for value in row.values.iter().rev().flatten() {
                if *value != 0.0 && value.is_finite() {
                    return *value;
                }
            }
        }
        0.0
    }

    /// First row matching any keyword while containing none of the
    /// `exclude` fragments.
    pub fn find_row(&self, keywords: &[&str], exclude: &[&str]) -> Option<&StatementRow> {
        self.matching_rows(keywords, exclude).next()
    }

    fn matching_rows<'a, 'b>(
        &'a self,
        keywords: &'b [&str],
        exclude: &'b [&str],
    ) -> impl Iterator<Item = &'a StatementRow> + use<'a, 'b> {
        self.rows.iter().filter(move |row| {
            let label = row.label.to_lowercase();
            keywords.iter().any(|k| label.contains(&k.to_lowercase()))
                && !exclude.iter().any(|e| label.contains(&e.to_lowercase()))
        })
    }
}

/// The three labeled tables a company export provides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementSet {
    pub profit_loss: StatementTable,
    pub balance_sheet: StatementTable,
    pub ratios: StatementTable,
}

/// Operational efficiency ratios pulled from the ratios table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyRatios {
    pub inventory_turnover: f64,
    pub current_ratio: f64,
    pub quick_ratio: f64,
    pub payables_turnover: f64,
}

/// First-to-last change of one line item across its non-zero periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthRecord {
    pub start: f64,
    pub end: f64,
    pub abs_change: f64,
    pub pct_change: f64,
    pub periods: usize,
}

/// Growth records for the headline statement lines. Absent when the line
/// could not be matched or has fewer than two usable periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub revenue: Option<GrowthRecord>,
    pub net_profit: Option<GrowthRecord>,
    pub assets: Option<GrowthRecord>,
    pub liabilities: Option<GrowthRecord>,
}

impl StatementSet {
    pub fn efficiency_ratios(&self) -> EfficiencyRatios {
        EfficiencyRatios {
            inventory_turnover: self.ratios.latest_value(&["Inventory Turnover"]),
            current_ratio: self.ratios.latest_value(&["Current Ratio"]),
            quick_ratio: self.ratios.latest_value(&["Quick Ratio"]),
            payables_turnover: self
                .ratios
                .latest_value(&["Trade Payables Turnover", "Creditors Turnover"]),
        }
    }

    /// Current ratio recomputed from the balance sheet when the ratios
    /// table does not carry it.
    pub fn current_ratio_fallback(&self) -> f64 {
        let assets = self
            .balance_sheet
            .latest_value(&["Current Assets", "Total Current Assets"]);
        let liabilities = self
            .balance_sheet
            .latest_value(&["Current Liabilities", "Total Current Liabilities"]);
        if liabilities > 0.0 {
            assets / liabilities
        } else {
            0.0
        }
    }

    pub fn growth_metrics(&self) -> GrowthMetrics {
        let revenue = growth_of(&self.profit_loss, &["revenue", "sales"], &[]);
        let net_profit = growth_of(
            &self.profit_loss,
            &["profit", "loss"],
            &["before", "gross", "operating", "cash"],
        );
        let assets = growth_of(
            &self.balance_sheet,
            &["total assets", "equity & liabilities"],
            &[],
        );
        let liabilities = growth_of(&self.balance_sheet, &["total liabilities", "total debt"], &[])
            .or_else(|| {
                // derive as assets minus equity when no liabilities line exists
                let equity = growth_of(
                    &self.balance_sheet,
                    &["total equity", "net worth"],
                    &[],
                )?;
                let assets = assets?;
                let start = assets.start - equity.start;
                let end = assets.end - equity.end;
                if start == 0.0 {
                    return None;
                }
                Some(GrowthRecord {
                    start,
                    end,
                    abs_change: end - start,
                    pct_change: (end - start) / start.abs() * 100.0,
                    periods: assets.periods,
                })
            });

        GrowthMetrics {
            revenue,
            net_profit,
            assets,
            liabilities,
        }
    }
}

fn growth_of(table: &StatementTable, keywords: &[&str], exclude: &[&str]) -> Option<GrowthRecord> {
    let row = table.find_row(keywords, exclude)?;
    let usable: Vec<f64> = row
        .values
        .iter()
        .flatten()
        .copied()
        .filter(|v| *v != 0.0 && v.is_finite())
        .collect();
    if usable.len() < 2 {
        return None;
    }
    let (start, end) = (usable[0], usable[usable.len() - 1]);
    Some(GrowthRecord {
        start,
        end,
        abs_change: end - start,
        pct_change: (end - start) / start.abs() * 100.0,
        periods: usable.len(),
    })
}
