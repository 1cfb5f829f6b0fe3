//! CLI library components for fjoin.

pub mod config;
pub mod logging;
pub mod summary;
pub mod types;
