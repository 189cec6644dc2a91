use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::position::Side;

/// An execution instruction produced by the decision engine.
///
/// The gateway consumes these uniformly; the engine never talks to the venue
/// in any other vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    OpenMarket {
        side: Side,
        #[serde(with = "rust_decimal::serde::str")]
        amount: Decimal,
    },
    CloseMarket {
        side: Side,
        #[serde(with = "rust_decimal::serde::str")]
        amount: Decimal,
    },
    PlaceStop {
        side: Side,
        #[serde(with = "rust_decimal::serde::str")]
        amount: Decimal,
        #[serde(with = "rust_decimal::serde::str")]
        stop_price: Decimal,
    },
    CancelStop {
        order_id: String,
    },
}

/// Gateway acknowledgement of a submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub filled_amount: Decimal,
    /// Average fill price when the venue reports one.
    pub avg_price: Option<Decimal>,
}

/// Ordered trace of what one decision tick did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Each attempted action with whether the gateway confirmed it.
    pub actions: Vec<(Action, bool)>,
}

impl TickReport {
    pub fn record(&mut self, action: Action, ok: bool) {
        self.actions.push((action, ok));
    }
}
