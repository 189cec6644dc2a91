//! Decision-making core: indicators, sizing, risk accounting, position
//! lifecycle and the per-candle engine that ties them together.

pub mod engine;
pub mod indicators;
pub mod position_book;
pub mod risk;
pub mod sizing;

pub use engine::DecisionEngine;
pub use position_book::PositionBook;
pub use risk::RiskGate;
