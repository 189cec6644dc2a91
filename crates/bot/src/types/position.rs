use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a futures position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }

    /// The side that closes (reduces) a position in this direction.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }

    /// +1 for long, −1 for short — the sign of PnL per unit price increase.
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Long => Decimal::ONE,
            Self::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

/// Locally tracked state of an open position.
///
/// The exchange is authoritative for existence, mark price, unrealized PnL
/// and percentage; everything else (contracts, layers, entry, take-profit
/// latch, stop bookkeeping) is owned here and survives remote refreshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    #[serde(with = "rust_decimal::serde::str")]
    pub contracts: Decimal,
    /// Price of the first layer; never recomputed when layers are added.
    #[serde(with = "rust_decimal::serde::str")]
    pub entry_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub mark_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub unrealized_pnl: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub percentage: Decimal,
    pub layers: u32,
    /// One-shot flash take-profit latch; never reset while the position lives.
    pub partial_tp_taken: bool,
    pub stop_loss_price: Option<Decimal>,
    pub stop_loss_order_id: Option<String>,
}

impl Position {
    /// A fresh single-layer position as first observed from the exchange.
    pub fn from_remote(remote: &RemotePosition) -> Self {
        Self {
            symbol: remote.symbol.clone(),
            side: remote.side,
            contracts: remote.contracts,
            entry_price: remote.entry_price,
            mark_price: remote.mark_price,
            unrealized_pnl: remote.unrealized_pnl,
            percentage: remote.percentage,
            layers: 1,
            partial_tp_taken: false,
            stop_loss_price: None,
            stop_loss_order_id: None,
        }
    }
}

/// The exchange's authoritative view of an open position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePosition {
    pub symbol: String,
    pub side: Side,
    #[serde(with = "rust_decimal::serde::str")]
    pub contracts: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub entry_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub mark_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub unrealized_pnl: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub percentage: Decimal,
}
