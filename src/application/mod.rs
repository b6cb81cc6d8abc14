pub mod features;
pub mod forecast;
pub mod models;
pub mod verdict;
