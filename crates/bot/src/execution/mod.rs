pub mod binance;

pub use binance::FuturesClient;

use rust_decimal::Decimal;

use crate::errors::BotError;
use crate::types::{OrderAck, RemotePosition, Side, OHLCV};

/// The venue boundary. Everything the decision engine asks of an exchange
/// goes through this trait; any failure means "the action did not happen"
/// and the engine carries on.
pub trait ExecutionGateway {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<OHLCV>, BotError>> + Send;

    fn get_balance(&self) -> impl std::future::Future<Output = Result<Decimal, BotError>> + Send;

    fn get_open_position(
        &self,
        symbol: &str,
    ) -> impl std::future::Future<Output = Result<Option<RemotePosition>, BotError>> + Send;

    fn submit_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: Decimal,
    ) -> impl std::future::Future<Output = Result<OrderAck, BotError>> + Send;

    /// Submit a reduce-only stop order protecting an open position.
    fn submit_stop_order(
        &self,
        symbol: &str,
        side: Side,
        amount: Decimal,
        stop_price: Decimal,
    ) -> impl std::future::Future<Output = Result<OrderAck, BotError>> + Send;

    fn cancel_order(
        &self,
        order_id: &str,
        symbol: &str,
    ) -> impl std::future::Future<Output = Result<(), BotError>> + Send;

    /// Market-close `amount` contracts of an open position.
    fn close_position(
        &self,
        symbol: &str,
        side: Side,
        amount: Decimal,
    ) -> impl std::future::Future<Output = Result<(), BotError>> + Send;

    fn set_leverage(
        &self,
        symbol: &str,
        leverage: u32,
    ) -> impl std::future::Future<Output = Result<(), BotError>> + Send;
}
