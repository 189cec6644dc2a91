use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable per-tick indicator bundle.
///
/// Computed once per decision cycle from OHLCV history; every decision that
/// tick reads the same values. `deviation` is `Decimal::MAX` when the fast
/// EMA is zero, so threshold comparisons reject the reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub ema_fast_current: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub ema_fast_prev: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub ema_slow_current: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub ema_macro_current: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub atr_current: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub rsi_current: Decimal,
    /// Percent change of the fast EMA versus the prior bar.
    #[serde(with = "rust_decimal::serde::str")]
    pub slope: Decimal,
    /// Percent distance of price from the fast EMA.
    #[serde(with = "rust_decimal::serde::str")]
    pub deviation: Decimal,
    /// Price/fast-EMA crossings over the chop look-back window.
    pub chop_cross_count: u32,
}
