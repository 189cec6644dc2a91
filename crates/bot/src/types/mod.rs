pub mod action;
pub mod market_data;
pub mod position;
pub mod snapshot;

pub use action::{Action, OrderAck, TickReport};
pub use market_data::OHLCV;
pub use position::{Position, RemotePosition, Side};
pub use snapshot::IndicatorSnapshot;
