use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use titan_bot::config;
use titan_bot::core::DecisionEngine;
use titan_bot::execution::{ExecutionGateway, FuturesClient};
use titan_bot::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignore if missing).
    let _ = dotenvy::dotenv();

    // Determine config directory — default to `./config`.
    let config_dir = std::env::var("TITAN_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    // Load and validate configuration.
    let config = config::load_config(&config_dir)?;

    // Initialize tracing — hold the guard for the process lifetime.
    let _guard = logging::init_tracing(&config.app.logging)?;

    info!(
        symbol = %config.exchange.symbol,
        timeframe = %config.exchange.timeframe,
        leverage = config.exchange.leverage,
        testnet = config.exchange.testnet,
        paper = config.exchange.paper,
        "Titan bot starting"
    );

    info!(
        ema = format!(
            "{}/{}/{}",
            config.strategy.ema_fast, config.strategy.ema_slow, config.strategy.ema_macro
        ),
        risk_per_trade = %config.risk.risk_per_trade,
        max_daily_loss = %config.risk.max_daily_loss,
        max_layers = config.risk.max_layers,
        "configuration loaded successfully"
    );

    // -----------------------------------------------------------------------
    // Exchange credentials
    // -----------------------------------------------------------------------

    let (api_key, api_secret) = load_credentials(&config.exchange)?;

    // -----------------------------------------------------------------------
    // Gateway and engine
    // -----------------------------------------------------------------------

    let gateway = FuturesClient::new(&config.exchange, api_key, api_secret);

    // Best effort: a failure here (e.g. leverage already set) must not stop
    // the bot from trading.
    if let Err(e) = gateway
        .set_leverage(&config.exchange.symbol, config.exchange.leverage)
        .await
    {
        warn!(error = %e, "failed to set leverage, continuing with account default");
    }

    let mut engine = DecisionEngine::new(gateway, config.clone(), Utc::now().date_naive());

    // -----------------------------------------------------------------------
    // Decision loop
    // -----------------------------------------------------------------------

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
        }
        info!("shutdown signal received, stopping gracefully...");
        signal_token.cancel();
    });

    let mut ticker =
        tokio::time::interval(Duration::from_secs(config.exchange.poll_interval_seconds));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!(
        interval_seconds = config.exchange.poll_interval_seconds,
        "decision loop running — press Ctrl+C to shutdown"
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let report = engine.run_tick(Utc::now().date_naive()).await;
                if !report.actions.is_empty() {
                    info!(actions = ?report.actions, "tick complete");
                }
            }
        }
    }

    info!("shutdown complete");
    Ok(())
}

// ---------------------------------------------------------------------------
// Initialization helpers
// ---------------------------------------------------------------------------

/// Read API credentials from the configured environment variables.
///
/// In paper mode missing credentials are tolerated (the bot still reads
/// public market data); in live mode they are required, which `validate`
/// has already enforced.
fn load_credentials(exchange: &config::ExchangeConfig) -> Result<(String, String)> {
    let api_key = std::env::var(&exchange.api_key_env)
        .ok()
        .filter(|v| !v.is_empty());
    let api_secret = std::env::var(&exchange.api_secret_env)
        .ok()
        .filter(|v| !v.is_empty());

    match (api_key, api_secret) {
        (Some(key), Some(secret)) => Ok((key, secret)),
        (key, _) if exchange.paper => {
            if key.is_none() {
                info!("no API credentials set — running unauthenticated (paper mode)");
            }
            Ok((String::new(), String::new()))
        }
        _ => Err(anyhow::anyhow!(
            "{} and {} are required in live mode",
            exchange.api_key_env,
            exchange.api_secret_env
        ))
        .context("failed to load exchange credentials"),
    }
}
