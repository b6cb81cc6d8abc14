use std::path::PathBuf;
use thiserror::Error;

/// Errors related to price history acquisition
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("No price history available for {symbol}")]
    NotFound { symbol: String },

    #[error("Malformed price history: {reason}")]
    Malformed { reason: String },

    #[error("Failed to read price history: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to local financial statement exports
#[derive(Debug, Error)]
pub enum StatementError {
    #[error("Statement file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Malformed statement file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Failed to read statement file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while fitting or querying regression models
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    #[error("Invalid training data: {0}")]
    InvalidData(String),
}
