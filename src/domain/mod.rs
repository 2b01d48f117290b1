//! Core domain types and the signal-and-simulation engine.

pub mod bar;
pub mod indicator;
pub mod signal;
pub mod sizing;
pub mod position;
pub mod portfolio;
pub mod simulator;
pub mod metrics;
pub mod config;
pub mod sweep;
pub mod error;
