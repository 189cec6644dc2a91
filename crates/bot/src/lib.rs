//! TITAN — single-symbol trend-following futures bot.
//!
//! Core decision pipeline: OHLCV history → indicator snapshot → risk gate →
//! position management / entry evaluation → execution actions. All exchange
//! interaction goes through the [`execution::ExecutionGateway`] trait.

pub mod config;
pub mod constants;
pub mod core;
pub mod errors;
pub mod execution;
pub mod logging;
pub mod types;
