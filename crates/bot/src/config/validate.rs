use anyhow::{bail, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::types::BotConfig;

/// Validate invariants across the merged config that serde alone cannot
/// enforce. Called automatically by [`super::load_config`].
pub fn validate_config(config: &BotConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    validate_exchange_config(config, &mut errors);
    validate_strategy_config(config, &mut errors);
    validate_risk_config(config, &mut errors);
    validate_live_mode_requirements(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        let msg = format!(
            "Configuration validation failed ({} error{}):\n  - {}",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" },
            errors.join("\n  - ")
        );
        bail!("{msg}");
    }
}

// ---------------------------------------------------------------------------
// Exchange config
// ---------------------------------------------------------------------------

fn validate_exchange_config(config: &BotConfig, errors: &mut Vec<String>) {
    let ex = &config.exchange;

    if ex.symbol.is_empty() {
        errors.push("exchange: symbol is empty".into());
    }

    if ex.timeframe.is_empty() {
        errors.push("exchange: timeframe is empty".into());
    }

    if ex.leverage == 0 || ex.leverage > 125 {
        errors.push(format!(
            "exchange: leverage ({}) must be in [1, 125]",
            ex.leverage
        ));
    }

    if ex.min_order_notional <= Decimal::ZERO {
        errors.push(format!(
            "exchange: min_order_notional ({}) must be > 0",
            ex.min_order_notional
        ));
    }

    if ex.amount_step <= Decimal::ZERO {
        errors.push(format!(
            "exchange: amount_step ({}) must be > 0",
            ex.amount_step
        ));
    }

    if ex.poll_interval_seconds == 0 {
        errors.push("exchange: poll_interval_seconds must be > 0".into());
    }
}

// ---------------------------------------------------------------------------
// Strategy config
// ---------------------------------------------------------------------------

fn validate_strategy_config(config: &BotConfig, errors: &mut Vec<String>) {
    let s = &config.strategy;

    // EMA ordering: fast < slow < macro.
    if s.ema_fast >= s.ema_slow {
        errors.push(format!(
            "strategy: ema_fast ({}) must be < ema_slow ({})",
            s.ema_fast, s.ema_slow
        ));
    }
    if s.ema_slow >= s.ema_macro {
        errors.push(format!(
            "strategy: ema_slow ({}) must be < ema_macro ({})",
            s.ema_slow, s.ema_macro
        ));
    }

    if s.ema_fast == 0 || s.atr_period == 0 || s.rsi_period == 0 {
        errors.push("strategy: indicator periods must all be > 0".into());
    }

    if s.slope_min <= Decimal::ZERO {
        errors.push(format!(
            "strategy: slope_min ({}) must be > 0",
            s.slope_min
        ));
    }

    if s.deviation_max <= Decimal::ZERO {
        errors.push(format!(
            "strategy: deviation_max ({}) must be > 0",
            s.deviation_max
        ));
    }

    if s.chop_lookback < 2 {
        errors.push(format!(
            "strategy: chop_lookback ({}) must be >= 2",
            s.chop_lookback
        ));
    }

    if s.chop_max_cross == 0 {
        errors.push("strategy: chop_max_cross must be > 0".into());
    }

    // RSI band ordering: oversold < overbought, both within (0, 100).
    if s.rsi_oversold >= s.rsi_overbought {
        errors.push(format!(
            "strategy: rsi_oversold ({}) must be < rsi_overbought ({})",
            s.rsi_oversold, s.rsi_overbought
        ));
    }
    if s.rsi_oversold <= Decimal::ZERO || s.rsi_overbought >= dec!(100) {
        errors.push(format!(
            "strategy: RSI bands ({}, {}) must lie inside (0, 100)",
            s.rsi_oversold, s.rsi_overbought
        ));
    }
}

// ---------------------------------------------------------------------------
// Risk config
// ---------------------------------------------------------------------------

fn validate_risk_config(config: &BotConfig, errors: &mut Vec<String>) {
    let r = &config.risk;

    if r.risk_per_trade <= Decimal::ZERO || r.risk_per_trade >= dec!(1) {
        errors.push(format!(
            "risk: risk_per_trade ({}) must be in (0, 1)",
            r.risk_per_trade
        ));
    }

    if r.max_daily_loss <= Decimal::ZERO || r.max_daily_loss >= dec!(1) {
        errors.push(format!(
            "risk: max_daily_loss ({}) must be in (0, 1)",
            r.max_daily_loss
        ));
    }

    if r.max_layers == 0 {
        errors.push("risk: max_layers must be > 0".into());
    }

    if r.pyramid_step_atr <= Decimal::ZERO {
        errors.push(format!(
            "risk: pyramid_step_atr ({}) must be > 0",
            r.pyramid_step_atr
        ));
    }

    if r.hard_sl_atr <= Decimal::ZERO {
        errors.push(format!(
            "risk: hard_sl_atr ({}) must be > 0",
            r.hard_sl_atr
        ));
    }
}

// ---------------------------------------------------------------------------
// Live mode requirements
// ---------------------------------------------------------------------------

fn validate_live_mode_requirements(config: &BotConfig, errors: &mut Vec<String>) {
    if config.exchange.paper {
        return; // Skip credential checks in paper mode.
    }

    for key in [&config.exchange.api_key_env, &config.exchange.api_secret_env] {
        if std::env::var(key).ok().filter(|v| !v.is_empty()).is_none() {
            errors.push(format!(
                "live mode: {key} env var is required when paper=false"
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;

    fn base_config() -> BotConfig {
        BotConfig {
            app: AppConfig {
                logging: LoggingConfig {
                    log_dir: "logs".into(),
                },
            },
            exchange: ExchangeConfig {
                symbol: "ETHUSDT".into(),
                timeframe: "1h".into(),
                leverage: 5,
                min_order_notional: dec!(10),
                amount_step: dec!(0.001),
                testnet: true,
                paper: true,
                api_key_env: "BINANCE_API_KEY".into(),
                api_secret_env: "BINANCE_API_SECRET".into(),
                recv_window_ms: 5000,
                poll_interval_seconds: 60,
            },
            strategy: StrategyConfig {
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
            },
            risk: RiskConfig {
                risk_per_trade: dec!(0.03),
                max_daily_loss: dec!(0.10),
                max_layers: 3,
                pyramid_step_atr: dec!(1.5),
                hard_sl_atr: dec!(2.0),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_ema_ordering_rejected() {
        let mut config = base_config();
        config.strategy.ema_fast = 30;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("ema_fast"));
    }

    #[test]
    fn test_risk_fraction_bounds() {
        let mut config = base_config();
        config.risk.risk_per_trade = dec!(1.5);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("risk_per_trade"));
    }

    #[test]
    fn test_zero_amount_step_rejected() {
        let mut config = base_config();
        config.exchange.amount_step = Decimal::ZERO;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("amount_step"));
    }

    #[test]
    fn test_rsi_band_ordering_rejected() {
        let mut config = base_config();
        config.strategy.rsi_oversold = dec!(80);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("rsi_oversold"));
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = base_config();
        config.strategy.ema_fast = 30;
        config.risk.max_layers = 0;
        let err = validate_config(&config).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("2 errors"), "got: {msg}");
    }
}
