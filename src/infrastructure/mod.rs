pub mod provider;
pub mod statements;
