//! Pure computation module for technical indicators.
//!
//! No I/O, no side effects. Takes OHLCV arrays and returns indicator values.
//! All computations use `Decimal` for precision. Insufficient data degrades
//! to a neutral sentinel (or `None` from [`compute_snapshot`]), never an
//! error.
//!
//! References:
//!     Wilder (1978), "New Concepts in Technical Trading Systems".

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::StrategyConfig;
use crate::types::{IndicatorSnapshot, OHLCV};

// ═══════════════════════════════════════════════════════════════════════════
// Standard Technical Indicators
// ═══════════════════════════════════════════════════════════════════════════

/// Exponential Moving Average.
///
/// Multiplier `k = 2 / (period + 1)`. First value seeded with SMA of the
/// first `period` prices. Returns empty `Vec` if insufficient data.
pub fn ema(prices: &[Decimal], period: usize) -> Vec<Decimal> {
    if prices.len() < period || period == 0 {
        return Vec::new();
    }

    let k = dec!(2) / Decimal::from(period as u64 + 1);
    let one_minus_k = dec!(1) - k;

    // Seed with SMA of first `period` values.
    let sma: Decimal = prices[..period].iter().copied().sum::<Decimal>()
        / Decimal::from(period as u64);

    let mut result = Vec::with_capacity(prices.len() - period + 1);
    result.push(sma);

    for &price in &prices[period..] {
        let prev = *result.last().expect("result is seeded with SMA");
        let ema_val = price * k + prev * one_minus_k;
        result.push(ema_val);
    }

    result
}

/// Relative Strength Index (Wilder's smoothing).
///
/// Uses smoothing factor `1/period` (not the standard EMA `2/(period+1)`).
/// Returns 50 if insufficient data.
pub fn rsi(prices: &[Decimal], period: usize) -> Decimal {
    if prices.len() < period + 1 || period == 0 {
        return dec!(50);
    }

    let period_d = Decimal::from(period as u64);
    let period_minus_1 = Decimal::from(period as u64 - 1);

    // Price changes.
    let changes: Vec<Decimal> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    // Initial average gain/loss from first `period` changes.
    let mut avg_gain = changes[..period]
        .iter()
        .map(|&c| if c > Decimal::ZERO { c } else { Decimal::ZERO })
        .sum::<Decimal>()
        / period_d;

    let mut avg_loss = changes[..period]
        .iter()
        .map(|&c| if c < Decimal::ZERO { -c } else { Decimal::ZERO })
        .sum::<Decimal>()
        / period_d;

    // Wilder's smoothing for remaining changes.
    for &c in &changes[period..] {
        if c > Decimal::ZERO {
            avg_gain = (avg_gain * period_minus_1 + c) / period_d;
            avg_loss = (avg_loss * period_minus_1) / period_d;
        } else {
            avg_gain = (avg_gain * period_minus_1) / period_d;
            avg_loss = (avg_loss * period_minus_1 + c.abs()) / period_d;
        }
    }

    if avg_loss == Decimal::ZERO {
        return dec!(100);
    }

    let rs = avg_gain / avg_loss;
    dec!(100) - (dec!(100) / (dec!(1) + rs))
}

/// Average True Range (Wilder's smoothing).
///
/// `TR = max(H-L, |H-prevC|, |L-prevC|)`.  Returns `Decimal::ZERO` on
/// mismatched or insufficient data.
pub fn atr(
    highs: &[Decimal],
    lows: &[Decimal],
    closes: &[Decimal],
    period: usize,
) -> Decimal {
    let n = highs.len();
    if n < period + 1 || lows.len() != n || closes.len() != n || period == 0 {
        return Decimal::ZERO;
    }

    // Compute true ranges.
    let true_ranges: Vec<Decimal> = (1..n)
        .map(|i| {
            let hl = highs[i] - lows[i];
            let hc = (highs[i] - closes[i - 1]).abs();
            let lc = (lows[i] - closes[i - 1]).abs();
            hl.max(hc).max(lc)
        })
        .collect();

    let period_d = Decimal::from(period as u64);
    let period_m1 = Decimal::from(period as u64 - 1);

    // First ATR = simple average of first `period` TRs.
    let mut atr_val: Decimal =
        true_ranges[..period].iter().copied().sum::<Decimal>() / period_d;

    // Wilder's smoothing for remaining TRs.
    for &tr in &true_ranges[period..] {
        atr_val = (atr_val * period_m1 + tr) / period_d;
    }

    atr_val
}

// ═══════════════════════════════════════════════════════════════════════════
// Trend & Filter Measures
// ═══════════════════════════════════════════════════════════════════════════

/// Percent change of an EMA versus its prior value. Returns 0 when the
/// prior value is zero.
pub fn slope(current: Decimal, prev: Decimal) -> Decimal {
    if prev == Decimal::ZERO {
        return Decimal::ZERO;
    }
    (current - prev) / prev * dec!(100)
}

/// Absolute percent distance of price from an EMA.
///
/// Returns `Decimal::MAX` when the EMA is zero, so any `< threshold`
/// comparison rejects the reading.
pub fn deviation(price: Decimal, ema_val: Decimal) -> Decimal {
    if ema_val == Decimal::ZERO {
        return Decimal::MAX;
    }
    ((price - ema_val) / ema_val * dec!(100)).abs()
}

/// Count price/EMA crossings over the trailing `lookback` bars.
///
/// Both series are tail-aligned; a crossing is counted when the close moves
/// from one side of the EMA (or touching it) to strictly the other side
/// between consecutive bars.
pub fn cross_count(closes: &[Decimal], ema_series: &[Decimal], lookback: usize) -> u32 {
    let n = closes.len().min(ema_series.len());
    if n < 2 || lookback < 2 {
        return 0;
    }

    let window = lookback.min(n);
    let closes = &closes[closes.len() - window..];
    let emas = &ema_series[ema_series.len() - window..];

    let mut crossings = 0u32;
    for i in 1..window {
        let crossed_up = closes[i - 1] <= emas[i - 1] && closes[i] > emas[i];
        let crossed_down = closes[i - 1] >= emas[i - 1] && closes[i] < emas[i];
        if crossed_up || crossed_down {
            crossings += 1;
        }
    }

    crossings
}

// ═══════════════════════════════════════════════════════════════════════════
// Composite
// ═══════════════════════════════════════════════════════════════════════════

/// Compute the per-tick indicator bundle from OHLCV history.
///
/// Returns `None` when history is too short for any of the configured
/// indicators; the caller treats that as a skipped cycle.
pub fn compute_snapshot(candles: &[OHLCV], config: &StrategyConfig) -> Option<IndicatorSnapshot> {
    let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
    let highs: Vec<Decimal> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<Decimal> = candles.iter().map(|c| c.low).collect();

    let price = *closes.last()?;

    let ema_fast_series = ema(&closes, config.ema_fast as usize);
    let ema_slow_series = ema(&closes, config.ema_slow as usize);
    let ema_macro_series = ema(&closes, config.ema_macro as usize);

    // The slope needs two fast-EMA values.
    if ema_fast_series.len() < 2 || ema_slow_series.is_empty() || ema_macro_series.is_empty() {
        return None;
    }

    let ema_fast_current = ema_fast_series[ema_fast_series.len() - 1];
    let ema_fast_prev = ema_fast_series[ema_fast_series.len() - 2];
    let ema_slow_current = *ema_slow_series.last()?;
    let ema_macro_current = *ema_macro_series.last()?;

    let atr_current = atr(&highs, &lows, &closes, config.atr_period as usize);
    if atr_current == Decimal::ZERO {
        return None;
    }

    let rsi_current = rsi(&closes, config.rsi_period as usize);

    Some(IndicatorSnapshot {
        price,
        ema_fast_current,
        ema_fast_prev,
        ema_slow_current,
        ema_macro_current,
        atr_current,
        rsi_current,
        slope: slope(ema_fast_current, ema_fast_prev),
        deviation: deviation(price, ema_fast_current),
        chop_cross_count: cross_count(
            &closes,
            &ema_fast_series,
            config.chop_lookback as usize,
        ),
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> StrategyConfig {
        StrategyConfig {
            ema_fast: 7,
            ema_slow: 25,
            ema_macro: 89,
            atr_period: 14,
            rsi_period: 14,
            slope_min: dec!(0.04),
            deviation_max: dec!(2.5),
            chop_lookback: 24,
            chop_max_cross: 5,
            rsi_overbought: dec!(75),
            rsi_oversold: dec!(25),
        }
    }

    fn candles_from_closes(closes: &[Decimal]) -> Vec<OHLCV> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| OHLCV {
                timestamp: i as i64 * 3600,
                open: c,
                high: c + dec!(1),
                low: c - dec!(1),
                close: c,
                volume: dec!(100),
            })
            .collect()
    }

    // -- EMA ---------------------------------------------------------------

    #[test]
    fn test_ema_basic() {
        let prices: Vec<Decimal> = (1..=10).map(Decimal::from).collect();
        let result = ema(&prices, 3);
        // First value = SMA of [1,2,3] = 2
        assert_eq!(result[0], dec!(2));
        assert_eq!(result.len(), 8); // 10 - 3 + 1
    }

    #[test]
    fn test_ema_insufficient_data() {
        let prices = vec![dec!(1), dec!(2)];
        assert!(ema(&prices, 5).is_empty());
    }

    #[test]
    fn test_ema_period_zero() {
        let prices = vec![dec!(1), dec!(2), dec!(3)];
        assert!(ema(&prices, 0).is_empty());
    }

    // -- RSI ---------------------------------------------------------------

    #[test]
    fn test_rsi_all_gains() {
        // Monotonically increasing -> RSI should be 100.
        let prices: Vec<Decimal> = (1..=20).map(Decimal::from).collect();
        assert_eq!(rsi(&prices, 14), dec!(100));
    }

    #[test]
    fn test_rsi_all_losses() {
        // Monotonically decreasing -> RSI should be near 0.
        let prices: Vec<Decimal> = (0..20).rev().map(|i| Decimal::from(i + 1)).collect();
        let val = rsi(&prices, 14);
        assert!(val < dec!(1), "expected near-zero RSI, got {val}");
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let prices = vec![dec!(10), dec!(11)];
        assert_eq!(rsi(&prices, 14), dec!(50));
    }

    // -- ATR ---------------------------------------------------------------

    #[test]
    fn test_atr_mismatched_lengths() {
        let highs = vec![dec!(10), dec!(11)];
        let lows = vec![dec!(9)];
        let closes = vec![dec!(10), dec!(10)];
        assert_eq!(atr(&highs, &lows, &closes, 14), Decimal::ZERO);
    }

    #[test]
    fn test_atr_basic() {
        // 16 bars, ATR period 14 -> should produce a value.
        let highs: Vec<Decimal> = (0..16).map(|i| Decimal::from(102 + i % 3)).collect();
        let lows: Vec<Decimal> = (0..16).map(|i| Decimal::from(98 - i % 3)).collect();
        let closes: Vec<Decimal> = (0..16).map(|_| dec!(100)).collect();
        let val = atr(&highs, &lows, &closes, 14);
        assert!(val > Decimal::ZERO);
    }

    // -- Slope -------------------------------------------------------------

    #[test]
    fn test_slope_basic() {
        assert_eq!(slope(dec!(101), dec!(100)), dec!(1));
        assert_eq!(slope(dec!(99), dec!(100)), dec!(-1));
    }

    #[test]
    fn test_slope_zero_prev() {
        assert_eq!(slope(dec!(100), Decimal::ZERO), Decimal::ZERO);
    }

    // -- Deviation ---------------------------------------------------------

    #[test]
    fn test_deviation_basic() {
        assert_eq!(deviation(dec!(102), dec!(100)), dec!(2));
        assert_eq!(deviation(dec!(98), dec!(100)), dec!(2));
    }

    #[test]
    fn test_deviation_zero_ema_is_unusable() {
        let d = deviation(dec!(100), Decimal::ZERO);
        // Must fail any `< threshold` check.
        assert!(d >= dec!(1000000));
    }

    // -- Cross count -------------------------------------------------------

    #[test]
    fn test_cross_count_oscillating() {
        // Price alternates around a flat EMA of 100 -> a crossing per bar.
        let closes: Vec<Decimal> = (0..10)
            .map(|i| if i % 2 == 0 { dec!(101) } else { dec!(99) })
            .collect();
        let emas = vec![dec!(100); 10];
        assert_eq!(cross_count(&closes, &emas, 10), 9);
    }

    #[test]
    fn test_cross_count_trending() {
        // Price stays above EMA -> no crossings.
        let closes: Vec<Decimal> = (0..10).map(|i| Decimal::from(110 + i)).collect();
        let emas = vec![dec!(100); 10];
        assert_eq!(cross_count(&closes, &emas, 10), 0);
    }

    #[test]
    fn test_cross_count_touch_then_break() {
        // At-the-EMA touch followed by a move above counts once.
        let closes = vec![dec!(99), dec!(100), dec!(101)];
        let emas = vec![dec!(100); 3];
        assert_eq!(cross_count(&closes, &emas, 3), 1);
    }

    #[test]
    fn test_cross_count_short_input() {
        assert_eq!(cross_count(&[dec!(1)], &[dec!(1)], 24), 0);
    }

    // -- Snapshot ----------------------------------------------------------

    #[test]
    fn test_snapshot_insufficient_history() {
        let candles = candles_from_closes(&[dec!(100); 10]);
        assert!(compute_snapshot(&candles, &strategy()).is_none());
    }

    #[test]
    fn test_snapshot_complete() {
        let closes: Vec<Decimal> = (0..150)
            .map(|i| dec!(2000) + Decimal::from(i))
            .collect();
        let candles = candles_from_closes(&closes);
        let snap = compute_snapshot(&candles, &strategy()).expect("history is sufficient");

        assert_eq!(snap.price, dec!(2149));
        // Rising series: fast EMA above slow, slow above macro, positive slope.
        assert!(snap.ema_fast_current > snap.ema_slow_current);
        assert!(snap.ema_slow_current > snap.ema_macro_current);
        assert!(snap.slope > Decimal::ZERO);
        assert!(snap.atr_current > Decimal::ZERO);
        assert_eq!(snap.rsi_current, dec!(100));
    }
}
