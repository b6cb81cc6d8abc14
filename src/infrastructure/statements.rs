//! Loader for locally exported financial statement CSVs.
//!
//! The exports carry two banner lines before the header row, thousands
//! separators inside numbers, stray unnamed columns, and filler rows like
//! `12 mths`. The loader normalizes all of that into `StatementTable`s;
//! a missing or unreadable file becomes an empty table, never an error,
//! so the dashboard degrades to "no data" instead of failing.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::errors::StatementError;
use crate::domain::financials::{StatementSet, StatementTable};

/// Lines before the header row in every export.
const BANNER_LINES: usize = 2;

const PROFIT_LOSS_PREFIX: &str = "Statement of Profit & Loss";
const BALANCE_SHEET_PREFIX: &str = "Assets & Liabilities";
const RATIOS_PREFIX: &str = "Financial Ratios";

pub struct StatementLoader {
    base_dir: PathBuf,
}

impl StatementLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Loads the three statement tables for a company. Each table falls
    /// back to empty independently.
    pub fn load(&self, company: &str) -> StatementSet {
        StatementSet {
            profit_loss: self.load_table(PROFIT_LOSS_PREFIX, company),
            balance_sheet: self.load_table(BALANCE_SHEET_PREFIX, company),
            ratios: self.load_table(RATIOS_PREFIX, company),
        }
    }

    fn load_table(&self, prefix: &str, company: &str) -> StatementTable {
        // some exports come with a doubled extension
        let candidates = [
            self.base_dir.join(format!("{prefix}_{company}.csv")),
            self.base_dir.join(format!("{prefix}_{company}..csv")),
        ];
        let Some(path) = candidates.iter().find(|p| p.exists()) else {
            warn!(prefix, company, "statement export not found");
            return StatementTable::empty();
        };

        match parse_statement_csv(path) {
            Ok(table) => {
                info!(
                    path = %path.display(),
                    rows = table.rows().len(),
                    "loaded statement export"
                );
                table
            }
            Err(e) => {
                warn!("failed to parse {}: {}", path.display(), e);
                StatementTable::empty()
            }
        }
    }
}

/// Parses one export into a sparse table. Filler rows are dropped and
/// unparseable cells become missing values.
pub fn parse_statement_csv(path: &Path) -> Result<StatementTable, StatementError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| StatementError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut records = reader.records().skip(BANNER_LINES);
    let header = records
        .next()
        .transpose()
        .map_err(|e| StatementError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| StatementError::Malformed {
            path: path.to_path_buf(),
            reason: "no header row".to_string(),
        })?;

    // keep named period columns, drop the export's unnamed spillover
    let mut kept = Vec::new();
    let mut periods = Vec::new();
    for (idx, name) in header.iter().enumerate().skip(1) {
        let name = name.trim();
        if !name.is_empty() && !name.starts_with("Unnamed") {
            kept.push(idx);
            periods.push(name.to_string());
        }
    }

    let mut table = StatementTable::new(periods);
    for record in records {
        let record = record.map_err(|e| StatementError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let label = record.get(0).unwrap_or("").trim();
        if label.is_empty() || label.starts_with('-') || label.contains("12 mths") {
            continue;
        }
        let values = kept
            .iter()
            .map(|&idx| parse_cell(record.get(idx).unwrap_or("")))
            .collect();
        table.push_row(label, values);
    }
    Ok(table)
}

fn parse_cell(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
STANDALONE STATEMENT OF PROFIT & LOSS,,,,
------------------- in Rs. Cr. -------------------,,,,
Metric,Mar 22,Mar 23,Mar 24,Unnamed: 4
,12 mths,12 mths,12 mths,
Revenue From Operations [Net],\"8,925.00\",\"10,892.25\",\"12,204.00\",
Profit/Loss Before Tax,512.00,688.10,novalue,
Profit/Loss For The Period,381.00,512.50,604.25,
---,,,,
";

    fn write_export(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, EXPORT).unwrap();
        path
    }

    #[test]
    fn test_parse_skips_banner_filler_and_unnamed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), "pl.csv");
        let table = parse_statement_csv(&path).unwrap();

        assert_eq!(table.periods(), ["Mar 22", "Mar 23", "Mar 24"]);
        // the `12 mths` filler row and the dashed row are gone
        assert_eq!(table.rows().len(), 3);
        assert_eq!(table.latest_value(&["revenue"]), 12_204.00);
    }

    #[test]
    fn test_unparseable_cell_becomes_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), "pl.csv");
        let table = parse_statement_csv(&path).unwrap();
        // latest period of "Before Tax" is junk, so the scan falls back
        assert_eq!(table.latest_value(&["before tax"]), 688.10);
    }

    #[test]
    fn test_loader_handles_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let set = StatementLoader::new(dir.path()).load("AVENUE");
        assert!(set.profit_loss.is_empty());
        assert!(set.balance_sheet.is_empty());
        assert!(set.ratios.is_empty());
    }

    #[test]
    fn test_loader_accepts_doubled_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_export(dir.path(), "Statement of Profit & Loss_AVENUE..csv");
        let set = StatementLoader::new(dir.path()).load("AVENUE");
        assert!(!set.profit_loss.is_empty());
        assert!(set.balance_sheet.is_empty());
    }
}
