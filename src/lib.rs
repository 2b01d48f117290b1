//! trendsim: EMA crossover backtester with ATR stops.
//!
//! Hexagonal architecture: the engine in [`domain`], collaborator traits in
//! [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
