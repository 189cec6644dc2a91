//! Binance USD-M futures REST client.
//!
//! Public market data goes unauthenticated; account and order endpoints are
//! signed with HMAC-SHA256 over the query string and carry the API key in
//! the `X-MBX-APIKEY` header. Stop orders are submitted through an ordered
//! list of strategies (`STOP_MARKET`, then `STOP` with a protective limit);
//! only when every variant fails is the submission reported as one failure.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::config::ExchangeConfig;
use crate::constants::{AMOUNT_DECIMALS, BINANCE_FUTURES_BASE, BINANCE_FUTURES_TESTNET_BASE};
use crate::errors::BotError;
use crate::execution::ExecutionGateway;
use crate::types::{OrderAck, RemotePosition, Side, OHLCV};

/// Stop-order submission strategies, tried in order.
const STOP_ORDER_TYPES: &[&str] = &["STOP_MARKET", "STOP"];

pub struct FuturesClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    recv_window_ms: u64,
}

impl FuturesClient {
    pub fn new(config: &ExchangeConfig, api_key: String, api_secret: String) -> Self {
        let base_url = if config.testnet {
            BINANCE_FUTURES_TESTNET_BASE
        } else {
            BINANCE_FUTURES_BASE
        };
        Self {
            http: Client::new(),
            base_url: base_url.to_string(),
            api_key,
            api_secret,
            recv_window_ms: config.recv_window_ms,
        }
    }

    // -----------------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------------

    fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// HMAC-SHA256 signature over the query string, hex-encoded.
    fn sign(&self, query: &str) -> Result<String, BotError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| BotError::Exchange {
                reason: format!("failed to create HMAC: {e}"),
            })?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Unsigned GET returning the raw JSON body.
    async fn public_get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, BotError> {
        let url = format!("{}{}?{}", self.base_url, path, Self::build_query(params));
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("HTTP {status} from {path}: {body}");
            return Err(BotError::Exchange {
                reason: format!("{path} returned {status}"),
            });
        }
        Ok(resp.json::<Value>().await?)
    }

    /// Signed request: appends `recvWindow`, `timestamp` and `signature`.
    async fn signed_request(
        &self,
        method: reqwest::Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, BotError> {
        let mut all: Vec<(&str, String)> = params.to_vec();
        all.push(("recvWindow", self.recv_window_ms.to_string()));
        all.push(("timestamp", Self::now_millis().to_string()));

        let query = Self::build_query(&all);
        let signature = self.sign(&query)?;
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        let resp = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.json::<Value>().await?;
        if !status.is_success() {
            let reason = body
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown exchange error")
                .to_string();
            warn!("HTTP {status} from {path}: {reason}");
            return Err(BotError::OrderRejected { reason });
        }
        Ok(body)
    }

    fn ack_from_order_response(body: &Value) -> OrderAck {
        OrderAck {
            order_id: body
                .get("orderId")
                .map(|v| v.to_string().trim_matches('"').to_string())
                .unwrap_or_default(),
            filled_amount: parse_decimal_str(body.get("executedQty").unwrap_or(&Value::Null)),
            avg_price: body
                .get("avgPrice")
                .map(parse_decimal_str)
                .filter(|p| *p > Decimal::ZERO),
        }
    }
}

impl ExecutionGateway for FuturesClient {
    /// Fetch OHLCV candles.
    ///
    /// `/fapi/v1/klines` returns `[[open_time, O, H, L, C, V, …], …]`.
    async fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: u32,
    ) -> Result<Vec<OHLCV>, BotError> {
        let data = self
            .public_get(
                "/fapi/v1/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", timeframe.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let arr = data.as_array().ok_or_else(|| BotError::DataUnavailable {
            name: "klines response not an array".into(),
        })?;

        let mut candles = Vec::with_capacity(arr.len());
        for k in arr {
            let items = match k.as_array() {
                Some(a) if a.len() >= 6 => a,
                _ => continue,
            };
            candles.push(OHLCV {
                timestamp: items[0].as_i64().unwrap_or(0) / 1000,
                open: parse_decimal_str(&items[1]),
                high: parse_decimal_str(&items[2]),
                low: parse_decimal_str(&items[3]),
                close: parse_decimal_str(&items[4]),
                volume: parse_decimal_str(&items[5]),
            });
        }

        debug!(
            symbol,
            timeframe,
            candles = candles.len(),
            "klines fetched"
        );

        Ok(candles)
    }

    /// USDT wallet balance from `/fapi/v2/balance`.
    async fn get_balance(&self) -> Result<Decimal, BotError> {
        let body = self
            .signed_request(reqwest::Method::GET, "/fapi/v2/balance", &[])
            .await?;

        let arr = body.as_array().ok_or_else(|| BotError::DataUnavailable {
            name: "balance response not an array".into(),
        })?;

        let usdt = arr
            .iter()
            .find(|entry| entry.get("asset").and_then(Value::as_str) == Some("USDT"))
            .ok_or_else(|| BotError::DataUnavailable {
                name: "USDT balance entry".into(),
            })?;

        Ok(parse_decimal_str(
            usdt.get("balance").unwrap_or(&Value::Null),
        ))
    }

    /// Open position (if any) from `/fapi/v2/positionRisk`.
    ///
    /// Binance reports a row even when flat; zero `positionAmt` means no
    /// position.
    async fn get_open_position(&self, symbol: &str) -> Result<Option<RemotePosition>, BotError> {
        let body = self
            .signed_request(
                reqwest::Method::GET,
                "/fapi/v2/positionRisk",
                &[("symbol", symbol.to_string())],
            )
            .await?;

        let arr = body.as_array().ok_or_else(|| BotError::DataUnavailable {
            name: "positionRisk response not an array".into(),
        })?;

        for entry in arr {
            let amt = parse_decimal_str(entry.get("positionAmt").unwrap_or(&Value::Null));
            if amt == Decimal::ZERO {
                continue;
            }

            let side = if amt > Decimal::ZERO {
                Side::Long
            } else {
                Side::Short
            };
            let entry_price = parse_decimal_str(entry.get("entryPrice").unwrap_or(&Value::Null));
            let mark_price = parse_decimal_str(entry.get("markPrice").unwrap_or(&Value::Null));
            let unrealized =
                parse_decimal_str(entry.get("unRealizedProfit").unwrap_or(&Value::Null));

            // Percentage return on entry notional.
            let notional = entry_price * amt.abs();
            let percentage = if notional > Decimal::ZERO {
                unrealized / notional * Decimal::ONE_HUNDRED
            } else {
                Decimal::ZERO
            };

            return Ok(Some(RemotePosition {
                symbol: symbol.to_string(),
                side,
                contracts: amt.abs(),
                entry_price,
                mark_price,
                unrealized_pnl: unrealized,
                percentage,
            }));
        }

        Ok(None)
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: Decimal,
    ) -> Result<OrderAck, BotError> {
        let binance_side = match side {
            Side::Long => "BUY",
            Side::Short => "SELL",
        };

        let body = self
            .signed_request(
                reqwest::Method::POST,
                "/fapi/v1/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("side", binance_side.to_string()),
                    ("type", "MARKET".to_string()),
                    ("quantity", format_amount(amount)),
                ],
            )
            .await?;

        debug!(symbol, side = side.as_str(), %amount, "market order submitted");
        Ok(Self::ack_from_order_response(&body))
    }

    /// Reduce-only protective stop. Tries each stop-order variant in turn
    /// and reports a single failure only when all are exhausted.
    async fn submit_stop_order(
        &self,
        symbol: &str,
        side: Side,
        amount: Decimal,
        stop_price: Decimal,
    ) -> Result<OrderAck, BotError> {
        let binance_side = match side {
            Side::Long => "BUY",
            Side::Short => "SELL",
        };

        let mut last_err: Option<BotError> = None;
        for order_type in STOP_ORDER_TYPES {
            let mut params = vec![
                ("symbol", symbol.to_string()),
                ("side", binance_side.to_string()),
                ("type", order_type.to_string()),
                ("quantity", format_amount(amount)),
                ("stopPrice", stop_price.to_string()),
                ("reduceOnly", "true".to_string()),
            ];
            // The limit variant needs a price; use the trigger as the limit.
            if *order_type == "STOP" {
                params.push(("price", stop_price.to_string()));
            }

            match self
                .signed_request(reqwest::Method::POST, "/fapi/v1/order", &params)
                .await
            {
                Ok(body) => {
                    debug!(
                        symbol,
                        order_type,
                        %stop_price,
                        "stop order submitted"
                    );
                    return Ok(Self::ack_from_order_response(&body));
                }
                Err(e) => {
                    warn!(symbol, order_type, error = %e, "stop order variant failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or(BotError::OrderRejected {
            reason: "no stop order strategy available".into(),
        }))
    }

    async fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<(), BotError> {
        self.signed_request(
            reqwest::Method::DELETE,
            "/fapi/v1/order",
            &[
                ("symbol", symbol.to_string()),
                ("orderId", order_id.to_string()),
            ],
        )
        .await?;
        debug!(symbol, order_id, "order cancelled");
        Ok(())
    }

    /// Close `amount` contracts with a reduce-only market order on the
    /// opposite side.
    async fn close_position(&self, symbol: &str, side: Side, amount: Decimal) -> Result<(), BotError> {
        let close_side = match side.opposite() {
            Side::Long => "BUY",
            Side::Short => "SELL",
        };

        self.signed_request(
            reqwest::Method::POST,
            "/fapi/v1/order",
            &[
                ("symbol", symbol.to_string()),
                ("side", close_side.to_string()),
                ("type", "MARKET".to_string()),
                ("quantity", format_amount(amount)),
                ("reduceOnly", "true".to_string()),
            ],
        )
        .await?;

        debug!(symbol, side = side.as_str(), %amount, "position close submitted");
        Ok(())
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<(), BotError> {
        self.signed_request(
            reqwest::Method::POST,
            "/fapi/v1/leverage",
            &[
                ("symbol", symbol.to_string()),
                ("leverage", leverage.to_string()),
            ],
        )
        .await?;
        debug!(symbol, leverage, "leverage set");
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Free helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Render a contract amount at the venue's quantity precision.
fn format_amount(amount: Decimal) -> String {
    amount.round_dp(AMOUNT_DECIMALS).normalize().to_string()
}

/// Parse a `serde_json::Value` that may be a number-as-string into `Decimal`.
fn parse_decimal_str(v: &Value) -> Decimal {
    use rust_decimal::prelude::FromPrimitive;
    v.as_str()
        .and_then(|s| s.parse::<Decimal>().ok())
        .or_else(|| v.as_f64().and_then(Decimal::from_f64))
        .unwrap_or(Decimal::ZERO)
}
