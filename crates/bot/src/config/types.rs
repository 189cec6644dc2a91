use rust_decimal::Decimal;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub app: AppConfig,
    pub exchange: ExchangeConfig,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
}

// ---------------------------------------------------------------------------
// app.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: String,
}

// ---------------------------------------------------------------------------
// exchange.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Venue symbol, e.g. `ETHUSDT`.
    pub symbol: String,
    /// Candle interval, e.g. `1h`.
    pub timeframe: String,
    pub leverage: u32,
    /// Smallest acceptable order notional in quote currency.
    #[serde(with = "rust_decimal::serde::str")]
    pub min_order_notional: Decimal,
    /// Contract amount granularity (orders are floored to a multiple).
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_step: Decimal,
    pub testnet: bool,
    /// Paper mode: missing API credentials are tolerated at startup.
    pub paper: bool,
    /// Env var names holding the API credentials.
    pub api_key_env: String,
    pub api_secret_env: String,
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,
    /// Seconds between decision ticks.
    pub poll_interval_seconds: u64,
}

fn default_recv_window() -> u64 {
    crate::constants::DEFAULT_RECV_WINDOW_MS
}

// ---------------------------------------------------------------------------
// strategy.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    pub ema_fast: u32,
    pub ema_slow: u32,
    pub ema_macro: u32,
    pub atr_period: u32,
    pub rsi_period: u32,
    /// Minimum fast-EMA slope (percent per bar) for trend entries.
    #[serde(with = "rust_decimal::serde::str")]
    pub slope_min: Decimal,
    /// Maximum percent distance of price from the fast EMA.
    #[serde(with = "rust_decimal::serde::str")]
    pub deviation_max: Decimal,
    /// Bars inspected by the chop filter.
    pub chop_lookback: u32,
    /// Price/fast-EMA crossings at or above this count mark a choppy market.
    pub chop_max_cross: u32,
    #[serde(with = "rust_decimal::serde::str")]
    pub rsi_overbought: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub rsi_oversold: Decimal,
}

impl StrategyConfig {
    /// Candle count needed per tick: longest warm-up plus padding.
    pub fn history_limit(&self) -> u32 {
        self.ema_macro.max(self.chop_lookback) + crate::constants::HISTORY_PADDING
    }
}

// ---------------------------------------------------------------------------
// risk.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Fraction of balance risked per trade, e.g. 0.03.
    #[serde(with = "rust_decimal::serde::str")]
    pub risk_per_trade: Decimal,
    /// Daily loss fraction at which all trading halts, e.g. 0.10.
    #[serde(with = "rust_decimal::serde::str")]
    pub max_daily_loss: Decimal,
    pub max_layers: u32,
    /// ATR multiples of favourable movement required before adding a layer.
    #[serde(with = "rust_decimal::serde::str")]
    pub pyramid_step_atr: Decimal,
    /// ATR multiples for the initial hard stop distance.
    #[serde(with = "rust_decimal::serde::str")]
    pub hard_sl_atr: Decimal,
}
