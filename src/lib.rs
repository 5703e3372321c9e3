//! trendangle: EMA angle trend-following backtester.
//!
//! Hexagonal architecture: the simulation engine and bar preparation live in
//! [`domain`], port traits in [`ports`], concrete implementations in
//! [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
