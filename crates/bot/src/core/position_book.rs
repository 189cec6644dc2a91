//! Local position lifecycle, reconciled against the exchange.
//!
//! The exchange is authoritative for whether a position exists and for its
//! mark price / unrealized PnL; contracts, layers, entry price, the
//! take-profit latch and stop bookkeeping are authoritative here, because
//! the venue knows nothing about pyramiding or partial-TP state.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use crate::types::{Position, RemotePosition};

/// Amount and realized-PnL outcome of a confirmed close.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedPortion {
    pub contracts: Decimal,
    /// `(mark − entry) × contracts`, sign-flipped for shorts.
    pub realized_pnl: Decimal,
    /// Whether the close destroyed the position.
    pub fully_closed: bool,
}

/// Positions keyed by symbol. The bot trades one symbol, but the aggregate
/// scopes the at-most-one-position invariant per symbol.
#[derive(Debug, Default)]
pub struct PositionBook {
    positions: HashMap<String, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    /// Reconcile local state with the exchange's view.
    ///
    /// Remote none destroys the local position. A remote position with no
    /// local counterpart creates one (single layer, latch clear, no stop).
    /// When both exist, only mark price, unrealized PnL and percentage are
    /// refreshed; everything else is locally authoritative.
    pub fn sync(&mut self, symbol: &str, remote: Option<RemotePosition>) {
        match (self.positions.get_mut(symbol), remote) {
            (Some(_), None) => {
                info!(symbol, "position gone on exchange, dropping local state");
                self.positions.remove(symbol);
            }
            (None, Some(remote)) => {
                info!(
                    symbol,
                    side = remote.side.as_str(),
                    contracts = %remote.contracts,
                    entry = %remote.entry_price,
                    "position discovered on exchange"
                );
                self.positions
                    .insert(symbol.to_string(), Position::from_remote(&remote));
            }
            (Some(local), Some(remote)) => {
                local.mark_price = remote.mark_price;
                local.unrealized_pnl = remote.unrealized_pnl;
                local.percentage = remote.percentage;
            }
            (None, None) => {}
        }
    }

    /// Record a filled pyramid layer. A call at the layer cap is a logged
    /// no-op; callers check the cap before submitting the order.
    pub fn add_layer(&mut self, symbol: &str, amount: Decimal, max_layers: u32) {
        let Some(pos) = self.positions.get_mut(symbol) else {
            warn!(symbol, "add_layer with no position");
            return;
        };
        if pos.layers >= max_layers {
            warn!(symbol, layers = pos.layers, "add_layer at layer cap ignored");
            return;
        }
        if amount <= Decimal::ZERO {
            warn!(symbol, %amount, "add_layer with non-positive amount ignored");
            return;
        }
        pos.layers += 1;
        pos.contracts += amount;
        info!(
            symbol,
            layers = pos.layers,
            contracts = %pos.contracts,
            "pyramid layer added"
        );
    }

    /// Set the one-shot flash take-profit latch. Idempotent.
    pub fn mark_partial_tp_taken(&mut self, symbol: &str) {
        if let Some(pos) = self.positions.get_mut(symbol) {
            pos.partial_tp_taken = true;
        }
    }

    /// Record the local stop price; the order id is updated only when one
    /// is provided.
    pub fn update_stop_loss(&mut self, symbol: &str, price: Decimal, order_id: Option<String>) {
        if let Some(pos) = self.positions.get_mut(symbol) {
            pos.stop_loss_price = Some(price);
            if order_id.is_some() {
                pos.stop_loss_order_id = order_id;
            }
        }
    }

    /// Apply a gateway-confirmed close of `fraction` percent of the
    /// position. Returns `None` (a reported failure, not a panic) when no
    /// position exists.
    pub fn apply_close(&mut self, symbol: &str, fraction: Decimal) -> Option<ClosedPortion> {
        let pos = self.positions.get_mut(symbol)?;

        let fully = fraction >= dec!(100);
        let closed_contracts = if fully {
            pos.contracts
        } else {
            pos.contracts * fraction / dec!(100)
        };

        let realized_pnl =
            (pos.mark_price - pos.entry_price) * closed_contracts * pos.side.sign();

        if fully {
            info!(
                symbol,
                contracts = %closed_contracts,
                realized = %realized_pnl,
                "position fully closed"
            );
            self.positions.remove(symbol);
        } else {
            pos.contracts -= closed_contracts;
            info!(
                symbol,
                closed = %closed_contracts,
                remaining = %pos.contracts,
                realized = %realized_pnl,
                "position partially closed"
            );
        }

        Some(ClosedPortion {
            contracts: closed_contracts,
            realized_pnl,
            fully_closed: fully,
        })
    }
}
