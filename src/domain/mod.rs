//! Core domain types and logic: bar preparation, the trade simulation
//! engine, and the ledger it produces.

pub mod ohlcv;
pub mod bar;
pub mod session;
pub mod indicator;
pub mod indicator_helpers;
pub mod strategy;
pub mod signal;
pub mod sizing;
pub mod resolver;
pub mod ledger;
pub mod metrics;
pub mod backtest;
pub mod config_validation;
pub mod error;
