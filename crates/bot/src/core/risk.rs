//! Daily-loss risk gate.
//!
//! An explicit value object rather than ambient global state: callers pass
//! in "today" and the gate owns only the accumulated realized PnL and the
//! date it belongs to.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Accumulated realized PnL for the current calendar day, with automatic
/// reset when the day rolls over.
#[derive(Debug, Clone)]
pub struct RiskGate {
    daily_pnl: Decimal,
    last_reset: NaiveDate,
}

impl RiskGate {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            daily_pnl: Decimal::ZERO,
            last_reset: today,
        }
    }

    /// Realized PnL accumulated so far today.
    pub fn daily_pnl(&self) -> Decimal {
        self.daily_pnl
    }

    /// Credit a realized PnL delta (positive or negative) to today's total.
    pub fn record_realized(&mut self, today: NaiveDate, delta: Decimal) {
        self.roll_date(today);
        self.daily_pnl += delta;
        info!(
            delta = %delta,
            daily_pnl = %self.daily_pnl,
            "realized PnL recorded"
        );
    }

    /// Whether today's combined loss (realized + unrealized) has reached the
    /// configured fraction of balance. The boundary is inclusive: reaching
    /// the limit exactly halts trading.
    ///
    /// A non-positive balance reports a loss fraction of zero rather than
    /// dividing by it.
    pub fn daily_loss_exceeded(
        &mut self,
        today: NaiveDate,
        max_fraction: Decimal,
        balance: Decimal,
        unrealized: Decimal,
    ) -> bool {
        self.roll_date(today);

        let total = self.daily_pnl + unrealized;
        let loss_fraction = if balance > Decimal::ZERO {
            total.abs() / balance
        } else {
            Decimal::ZERO
        };

        let exceeded = loss_fraction >= max_fraction;
        if exceeded {
            warn!(
                loss_fraction = %loss_fraction,
                max_fraction = %max_fraction,
                daily_pnl = %self.daily_pnl,
                unrealized = %unrealized,
                "daily loss limit reached, trading halted for the day"
            );
        }
        exceeded
    }

    fn roll_date(&mut self, today: NaiveDate) {
        if today != self.last_reset {
            info!(
                previous_day = %self.last_reset,
                previous_pnl = %self.daily_pnl,
                "new trading day, daily PnL reset"
            );
            self.daily_pnl = Decimal::ZERO;
            self.last_reset = today;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_under_limit_allows_trading() {
        let mut gate = RiskGate::new(day(1));
        gate.record_realized(day(1), dec!(-60));
        // Balance 1000, limit 10%: loss 60 + 35 unrealized = 9.5% -> allowed.
        assert!(!gate.daily_loss_exceeded(day(1), dec!(0.10), dec!(1000), dec!(-35)));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let mut gate = RiskGate::new(day(1));
        gate.record_realized(day(1), dec!(-60));
        // Loss 60 + 40 unrealized = exactly 10% -> halted.
        assert!(gate.daily_loss_exceeded(day(1), dec!(0.10), dec!(1000), dec!(-40)));
    }

    #[test]
    fn test_scenario_just_under_limit() {
        let mut gate = RiskGate::new(day(1));
        gate.record_realized(day(1), dec!(-90));
        // |-95| / 1000 = 0.095 < 0.10
        assert!(!gate.daily_loss_exceeded(day(1), dec!(0.10), dec!(1000), dec!(-5)));

        let mut gate = RiskGate::new(day(1));
        gate.record_realized(day(1), dec!(-96));
        // |-96| / 1000 = 0.096, still under.
        assert!(!gate.daily_loss_exceeded(day(1), dec!(0.10), dec!(1000), Decimal::ZERO));
    }

    #[test]
    fn test_non_positive_balance_reports_zero() {
        let mut gate = RiskGate::new(day(1));
        gate.record_realized(day(1), dec!(-500));
        assert!(!gate.daily_loss_exceeded(day(1), dec!(0.10), Decimal::ZERO, Decimal::ZERO));
        assert!(!gate.daily_loss_exceeded(day(1), dec!(0.10), dec!(-5), Decimal::ZERO));
    }

    #[test]
    fn test_day_rollover_resets() {
        let mut gate = RiskGate::new(day(1));
        gate.record_realized(day(1), dec!(-200));
        assert!(gate.daily_loss_exceeded(day(1), dec!(0.10), dec!(1000), Decimal::ZERO));

        // Next day: the slate is clean.
        assert!(!gate.daily_loss_exceeded(day(2), dec!(0.10), dec!(1000), Decimal::ZERO));
        assert_eq!(gate.daily_pnl(), Decimal::ZERO);
    }

    #[test]
    fn test_record_on_new_day_resets_first() {
        let mut gate = RiskGate::new(day(1));
        gate.record_realized(day(1), dec!(-200));
        gate.record_realized(day(2), dec!(-10));
        assert_eq!(gate.daily_pnl(), dec!(-10));
    }
}
