//! Risk-based position sizing. Pure functions; the same inputs always
//! produce the same size.

use rust_decimal::Decimal;

/// Notional to deploy so that being stopped out loses `risk_fraction` of
/// balance.
///
/// `risk_amount = balance × risk_fraction`, `distance = |entry − stop|`,
/// `notional = risk_amount / distance × entry`. Degenerate inputs
/// (entry == stop) fall back to the minimum order notional, and any result
/// below the minimum is clamped up to it.
pub fn risk_notional(
    balance: Decimal,
    risk_fraction: Decimal,
    entry: Decimal,
    stop: Decimal,
    min_order_notional: Decimal,
) -> Decimal {
    let distance = (entry - stop).abs();
    if distance == Decimal::ZERO {
        return min_order_notional;
    }

    let risk_amount = balance * risk_fraction;
    let notional = risk_amount / distance * entry;

    notional.max(min_order_notional)
}

/// Convert a notional into a contract amount, floored to the exchange's
/// amount granularity. A result of zero (or less) means "do not trade".
pub fn to_contracts(notional: Decimal, price: Decimal, step: Decimal) -> Decimal {
    if price <= Decimal::ZERO || step <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let raw = notional / price;
    (raw / step).floor() * step
}
