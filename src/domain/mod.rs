pub mod errors;
pub mod financials;
pub mod market;
pub mod metrics;
