use serde::{Deserialize, Serialize};

/// Regression error report for one model candidate on a held-out slice.
///
/// MAPE is expressed in percent and is left undefined (infinite or NaN)
/// when an actual value is zero. Callers that feed price-level targets
/// accept that hazard; it is not masked here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
    pub mape: f64,
}

impl RegressionReport {
    /// Scores `predicted` against `actual`. Both slices must be the same
    /// length and non-empty.
    pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Self {
        debug_assert_eq!(actual.len(), predicted.len());
        let n = actual.len() as f64;

        let ss_res: f64 = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).powi(2))
            .sum();
        let rmse = (ss_res / n).sqrt();

        let mae = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).abs())
            .sum::<f64>()
            / n;

        let mape = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| ((a - p) / a).abs())
            .sum::<f64>()
            / n
            * 100.0;

        let mean = actual.iter().sum::<f64>() / n;
        let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        let r2 = if ss_tot < 1e-10 {
            // constant target: no variance to explain
            if ss_res < 1e-10 { 1.0 } else { 0.0 }
        } else {
            1.0 - ss_res / ss_tot
        };

        Self { r2, rmse, mae, mape }
    }
}
