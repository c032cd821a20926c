pub mod aggregator;
pub mod assembler;
pub mod config;
pub mod error;
pub mod indexer;
pub mod labels;
pub mod models;
pub mod pacing;

#[cfg(test)]
mod testing;
