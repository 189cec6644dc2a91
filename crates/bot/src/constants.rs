use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ---------------------------------------------------------------------------
// Strategy constants
// ---------------------------------------------------------------------------

/// Fraction of the position closed by a flash take-profit, in percent.
pub const FLASH_TP_CLOSE_PERCENT: Decimal = dec!(50);

/// Pyramid layers are sized at half the base risk-sized notional.
pub const PYRAMID_LAYER_FACTOR: Decimal = dec!(0.5);

/// ATR multiple for the trailing stop placed after a pyramid fill.
pub const TRAIL_STOP_ATR_MULT: Decimal = dec!(2);

/// RSI bounds that block entries into already-stretched moves.
pub const ENTRY_RSI_CEILING_LONG: Decimal = dec!(70);
pub const ENTRY_RSI_FLOOR_SHORT: Decimal = dec!(30);

// ---------------------------------------------------------------------------
// Data constants
// ---------------------------------------------------------------------------

/// Extra candles fetched beyond the longest indicator warm-up.
pub const HISTORY_PADDING: u32 = 50;

/// Contract amounts are quoted to this many decimal places.
pub const AMOUNT_DECIMALS: u32 = 3;

// ---------------------------------------------------------------------------
// Exchange constants
// ---------------------------------------------------------------------------

pub const BINANCE_FUTURES_BASE: &str = "https://fapi.binance.com";
pub const BINANCE_FUTURES_TESTNET_BASE: &str = "https://testnet.binancefuture.com";

/// Default `recvWindow` for signed requests, in milliseconds.
pub const DEFAULT_RECV_WINDOW_MS: u64 = 5_000;
