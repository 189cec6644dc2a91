pub mod types;
pub mod validate;

pub use types::*;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Load and merge all config JSON files into a single [`BotConfig`],
/// then apply environment variable overrides and validate.
///
/// Expected directory layout:
/// ```text
/// config/
///   app.json
///   exchange.json
///   strategy.json
///   risk.json
/// ```
///
/// # Environment variable overrides
///
/// The following env vars override the corresponding JSON config values:
///
/// | Env Var                | Config Field              |
/// |------------------------|---------------------------|
/// | `TITAN_SYMBOL`         | `exchange.symbol`         |
/// | `TITAN_TESTNET`        | `exchange.testnet`        |
/// | `TITAN_PAPER`          | `exchange.paper`          |
/// | `TITAN_LEVERAGE`       | `exchange.leverage`       |
/// | `TITAN_RISK_PER_TRADE` | `risk.risk_per_trade`     |
/// | `TITAN_MAX_DAILY_LOSS` | `risk.max_daily_loss`     |
pub fn load_config(config_dir: &Path) -> Result<BotConfig> {
    let read = |name: &str| -> Result<String> {
        let path = config_dir.join(name);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))
    };

    let app: AppConfig =
        serde_json::from_str(&read("app.json")?).context("parsing app.json")?;

    let exchange: ExchangeConfig =
        serde_json::from_str(&read("exchange.json")?).context("parsing exchange.json")?;

    let strategy: StrategyConfig =
        serde_json::from_str(&read("strategy.json")?).context("parsing strategy.json")?;

    let risk: RiskConfig =
        serde_json::from_str(&read("risk.json")?).context("parsing risk.json")?;

    let mut config = BotConfig {
        app,
        exchange,
        strategy,
        risk,
    };

    apply_env_overrides(&mut config);
    validate::validate_config(&config)?;

    Ok(config)
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides to the loaded config.
///
/// Only non-empty env vars take effect. Parse failures are logged and skipped
/// (the JSON default remains).
fn apply_env_overrides(config: &mut BotConfig) {
    if let Some(val) = env_string("TITAN_SYMBOL") {
        info!(symbol = %val, "env override: TITAN_SYMBOL");
        config.exchange.symbol = val;
    }

    if let Some(val) = env_bool("TITAN_TESTNET") {
        info!(testnet = val, "env override: TITAN_TESTNET");
        config.exchange.testnet = val;
    }

    if let Some(val) = env_bool("TITAN_PAPER") {
        info!(paper = val, "env override: TITAN_PAPER");
        config.exchange.paper = val;
    }

    if let Some(val) = env_parse::<u32>("TITAN_LEVERAGE") {
        info!(val, "env override: TITAN_LEVERAGE");
        config.exchange.leverage = val;
    }

    if let Some(val) = env_decimal("TITAN_RISK_PER_TRADE") {
        info!(%val, "env override: TITAN_RISK_PER_TRADE");
        config.risk.risk_per_trade = val;
    }

    if let Some(val) = env_decimal("TITAN_MAX_DAILY_LOSS") {
        info!(%val, "env override: TITAN_MAX_DAILY_LOSS");
        config.risk.max_daily_loss = val;
    }
}

/// Read a non-empty env var as a `String`.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read a non-empty env var as a bool (`true`, `1`, `yes` → true).
fn env_bool(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

/// Read a non-empty env var and parse it as `T`.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

/// Read a non-empty env var and parse it as `Decimal`.
fn env_decimal(key: &str) -> Option<Decimal> {
    env_string(key).and_then(|v| Decimal::from_str(&v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serial_test::serial;
    use std::path::PathBuf;

    fn project_config_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
    }

    // -----------------------------------------------------------------------
    // Helper: write a minimal set of config JSON files to a temp dir.
    // -----------------------------------------------------------------------

    fn write_test_configs(dir: &Path) {
        std::fs::write(
            dir.join("app.json"),
            r#"{ "logging": { "log_dir": "logs" } }"#,
        )
        .unwrap();

        std::fs::write(
            dir.join("exchange.json"),
            r#"{
                "symbol": "ETHUSDT",
                "timeframe": "1h",
                "leverage": 5,
                "min_order_notional": "10.0",
                "amount_step": "0.001",
                "testnet": true,
                "paper": true,
                "api_key_env": "BINANCE_API_KEY",
                "api_secret_env": "BINANCE_API_SECRET",
                "recv_window_ms": 5000,
                "poll_interval_seconds": 60
            }"#,
        )
        .unwrap();

        std::fs::write(
            dir.join("strategy.json"),
            r#"{
                "ema_fast": 7,
                "ema_slow": 25,
                "ema_macro": 89,
                "atr_period": 14,
                "rsi_period": 14,
                "slope_min": "0.04",
                "deviation_max": "2.5",
                "chop_lookback": 24,
                "chop_max_cross": 5,
                "rsi_overbought": "75",
                "rsi_oversold": "25"
            }"#,
        )
        .unwrap();

        std::fs::write(
            dir.join("risk.json"),
            r#"{
                "risk_per_trade": "0.03",
                "max_daily_loss": "0.10",
                "max_layers": 3,
                "pyramid_step_atr": "1.5",
                "hard_sl_atr": "2.0"
            }"#,
        )
        .unwrap();
    }

    // -----------------------------------------------------------------------
    // Env cleanup helper — prevents parallel test interference.
    // -----------------------------------------------------------------------

    /// Remove all bot-related env vars so tests don't interfere with each other.
    fn clean_bot_env() {
        for key in [
            "TITAN_SYMBOL",
            "TITAN_TESTNET",
            "TITAN_PAPER",
            "TITAN_LEVERAGE",
            "TITAN_RISK_PER_TRADE",
            "TITAN_MAX_DAILY_LOSS",
            "BINANCE_API_KEY",
            "BINANCE_API_SECRET",
        ] {
            std::env::remove_var(key);
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[test]
    #[serial]
    fn test_load_real_configs() {
        clean_bot_env();
        let dir = project_config_dir();
        if !dir.exists() {
            eprintln!("skipping — config dir not found at {}", dir.display());
            return;
        }
        // Force paper mode so credential checks don't block the test.
        std::env::set_var("TITAN_PAPER", "true");
        let config = load_config(&dir).expect("config should load and validate");
        assert_eq!(config.exchange.symbol, "ETHUSDT");
        assert!(config.exchange.paper);
        clean_bot_env();
    }

    #[test]
    #[serial]
    fn test_load_test_configs() {
        clean_bot_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());
        let config = load_config(tmp.path()).expect("test config should load");
        assert_eq!(config.exchange.symbol, "ETHUSDT");
        assert_eq!(config.strategy.ema_macro, 89);
        assert_eq!(config.risk.max_layers, 3);
        assert_eq!(config.risk.risk_per_trade, dec!(0.03));
        clean_bot_env();
    }

    #[test]
    #[serial]
    fn test_history_limit() {
        clean_bot_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());
        let config = load_config(tmp.path()).unwrap();
        // max(89, 24) + 50
        assert_eq!(config.strategy.history_limit(), 139);
        clean_bot_env();
    }

    #[test]
    #[serial]
    fn test_missing_config_file_errors() {
        clean_bot_env();
        let tmp = tempfile::tempdir().unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(
            err.to_string().contains("failed to read config file"),
            "expected file-not-found error, got: {err}"
        );
        clean_bot_env();
    }

    #[test]
    #[serial]
    fn test_env_override_symbol() {
        clean_bot_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("TITAN_SYMBOL", "BTCUSDT");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.exchange.symbol, "BTCUSDT");
        clean_bot_env();
    }

    #[test]
    #[serial]
    fn test_env_override_risk_per_trade() {
        clean_bot_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("TITAN_RISK_PER_TRADE", "0.01");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.risk.risk_per_trade, dec!(0.01));
        clean_bot_env();
    }

    #[test]
    #[serial]
    fn test_env_override_empty_string_ignored() {
        clean_bot_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("TITAN_LEVERAGE", "");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.exchange.leverage, 5);
        clean_bot_env();
    }

    #[test]
    #[serial]
    fn test_env_override_invalid_parse_ignored() {
        clean_bot_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("TITAN_LEVERAGE", "not_a_number");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.exchange.leverage, 5);
        clean_bot_env();
    }

    #[test]
    #[serial]
    fn test_live_mode_rejects_missing_credentials() {
        clean_bot_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        // Disable paper mode without providing credentials.
        std::env::set_var("TITAN_PAPER", "false");

        let err = load_config(tmp.path()).unwrap_err();
        assert!(
            err.to_string().contains("BINANCE_API_KEY"),
            "expected missing-credential error, got: {err}"
        );
        clean_bot_env();
    }

    #[test]
    #[serial]
    fn test_live_mode_accepts_credentials() {
        clean_bot_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path());

        std::env::set_var("TITAN_PAPER", "false");
        std::env::set_var("BINANCE_API_KEY", "k");
        std::env::set_var("BINANCE_API_SECRET", "s");

        let config = load_config(tmp.path()).unwrap();
        assert!(!config.exchange.paper);
        clean_bot_env();
    }
}
