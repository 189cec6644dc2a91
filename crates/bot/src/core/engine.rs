//! Per-candle decision engine.
//!
//! One `run_tick` per cycle: fetch history, compute the indicator snapshot,
//! consult the risk gate, then either manage the open position or evaluate
//! entry signals. Rules fire in strict priority order; gateway calls are
//! sequential with no in-tick retries, and every failure degrades to a
//! logged outcome.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::constants::{
    ENTRY_RSI_CEILING_LONG, ENTRY_RSI_FLOOR_SHORT, FLASH_TP_CLOSE_PERCENT, PYRAMID_LAYER_FACTOR,
    TRAIL_STOP_ATR_MULT,
};
use crate::core::position_book::PositionBook;
use crate::core::risk::RiskGate;
use crate::core::{indicators, sizing};
use crate::execution::ExecutionGateway;
use crate::types::{Action, IndicatorSnapshot, Side, TickReport};

pub struct DecisionEngine<G: ExecutionGateway> {
    gateway: G,
    book: PositionBook,
    risk_gate: RiskGate,
    config: BotConfig,
}

impl<G: ExecutionGateway> DecisionEngine<G> {
    pub fn new(gateway: G, config: BotConfig, today: NaiveDate) -> Self {
        Self {
            gateway,
            book: PositionBook::new(),
            risk_gate: RiskGate::new(today),
            config,
        }
    }

    pub fn book(&self) -> &PositionBook {
        &self.book
    }

    /// Run one decision cycle. Every early return is a skipped (not failed)
    /// cycle; the next tick starts from fresh state.
    pub async fn run_tick(&mut self, today: NaiveDate) -> TickReport {
        let mut report = TickReport::default();
        let symbol = self.config.exchange.symbol.clone();

        // 1. Market data.
        let limit = self.config.strategy.history_limit();
        let bars = match self
            .gateway
            .fetch_bars(&symbol, &self.config.exchange.timeframe, limit)
            .await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!(error = %e, "tick skipped: candle fetch failed");
                return report;
            }
        };

        // 2. Indicators.
        let Some(snapshot) = indicators::compute_snapshot(&bars, &self.config.strategy) else {
            debug!(bars = bars.len(), "tick skipped: insufficient indicator history");
            return report;
        };

        // 3. Balance.
        let balance = match self.gateway.get_balance().await {
            Ok(b) if b > Decimal::ZERO => b,
            Ok(b) => {
                warn!(balance = %b, "tick skipped: non-positive balance");
                return report;
            }
            Err(e) => {
                warn!(error = %e, "tick skipped: balance fetch failed");
                return report;
            }
        };

        // 4. Position sync.
        match self.gateway.get_open_position(&symbol).await {
            Ok(remote) => self.book.sync(&symbol, remote),
            Err(e) => {
                warn!(error = %e, "tick skipped: position sync failed");
                return report;
            }
        }

        // 5. Risk gate.
        let unrealized = self
            .book
            .get(&symbol)
            .map(|p| p.unrealized_pnl)
            .unwrap_or(Decimal::ZERO);
        if self.risk_gate.daily_loss_exceeded(
            today,
            self.config.risk.max_daily_loss,
            balance,
            unrealized,
        ) {
            return report;
        }

        // 6. Branch.
        if self.book.has_position(&symbol) {
            self.manage_position(&symbol, &snapshot, balance, today, &mut report)
                .await;
        } else {
            self.evaluate_entry(&symbol, &snapshot, balance, &mut report)
                .await;
        }

        report
    }

    // -----------------------------------------------------------------------
    // Position management
    // -----------------------------------------------------------------------

    /// Priority order: flash take-profit, trend-break exit, pyramiding.
    /// The first two terminate the tick when their condition holds; the
    /// pyramid check is the final rule either way.
    async fn manage_position(
        &mut self,
        symbol: &str,
        snap: &IndicatorSnapshot,
        balance: Decimal,
        today: NaiveDate,
        report: &mut TickReport,
    ) {
        let Some(pos) = self.book.get(symbol).cloned() else {
            return;
        };

        // 1. Flash take-profit: RSI stretched beyond the position's band and
        //    the one-shot latch still clear. Terminates the tick even when
        //    the close order fails.
        let flash_tp = !pos.partial_tp_taken
            && match pos.side {
                Side::Long => snap.rsi_current > self.config.strategy.rsi_overbought,
                Side::Short => snap.rsi_current < self.config.strategy.rsi_oversold,
            };
        if flash_tp {
            self.flash_take_profit(symbol, snap, today, report).await;
            return;
        }

        // 2. Trend break: price through the slow EMA against the position.
        let trend_broken = match pos.side {
            Side::Long => snap.price < snap.ema_slow_current,
            Side::Short => snap.price > snap.ema_slow_current,
        };
        if trend_broken {
            info!(
                symbol,
                side = pos.side.as_str(),
                price = %snap.price,
                ema_slow = %snap.ema_slow_current,
                "trend break, closing position"
            );
            self.close_full(symbol, today, report).await;
            return;
        }

        // 3. Pyramiding.
        self.try_pyramid(symbol, snap, balance, report).await;
    }

    async fn flash_take_profit(
        &mut self,
        symbol: &str,
        snap: &IndicatorSnapshot,
        today: NaiveDate,
        report: &mut TickReport,
    ) {
        let Some(pos) = self.book.get(symbol).cloned() else {
            return;
        };

        let close_amount = pos.contracts * FLASH_TP_CLOSE_PERCENT / dec!(100);
        let action = Action::CloseMarket {
            side: pos.side,
            amount: close_amount,
        };

        info!(
            symbol,
            side = pos.side.as_str(),
            rsi = %snap.rsi_current,
            amount = %close_amount,
            "flash take-profit firing"
        );

        match self
            .gateway
            .close_position(symbol, pos.side, close_amount)
            .await
        {
            Ok(()) => {
                report.record(action, true);
                if let Some(portion) = self.book.apply_close(symbol, FLASH_TP_CLOSE_PERCENT) {
                    self.risk_gate.record_realized(today, portion.realized_pnl);
                }
                self.book.mark_partial_tp_taken(symbol);
                // Move the stop to breakeven on the remaining size.
                self.relocate_stop(symbol, pos.entry_price, report).await;
            }
            Err(e) => {
                warn!(symbol, error = %e, "flash take-profit close failed");
                report.record(action, false);
            }
        }
    }

    async fn close_full(&mut self, symbol: &str, today: NaiveDate, report: &mut TickReport) {
        let Some(pos) = self.book.get(symbol).cloned() else {
            return;
        };

        let action = Action::CloseMarket {
            side: pos.side,
            amount: pos.contracts,
        };

        match self.gateway.close_position(symbol, pos.side, pos.contracts).await {
            Ok(()) => {
                report.record(action, true);
                // The protective stop is orphaned once the position is gone.
                if let Some(order_id) = pos.stop_loss_order_id.clone() {
                    let cancel = Action::CancelStop {
                        order_id: order_id.clone(),
                    };
                    match self.gateway.cancel_order(&order_id, symbol).await {
                        Ok(()) => report.record(cancel, true),
                        Err(e) => {
                            warn!(symbol, order_id, error = %e, "stop cancel failed");
                            report.record(cancel, false);
                        }
                    }
                }
                if let Some(portion) = self.book.apply_close(symbol, dec!(100)) {
                    self.risk_gate.record_realized(today, portion.realized_pnl);
                }
            }
            Err(e) => {
                warn!(symbol, error = %e, "full close failed");
                report.record(action, false);
            }
        }
    }

    async fn try_pyramid(
        &mut self,
        symbol: &str,
        snap: &IndicatorSnapshot,
        balance: Decimal,
        report: &mut TickReport,
    ) {
        let Some(pos) = self.book.get(symbol).cloned() else {
            return;
        };

        let displaced = (snap.price - pos.entry_price).abs()
            > self.config.risk.pyramid_step_atr * snap.atr_current;
        let eligible = pos.unrealized_pnl > Decimal::ZERO
            && displaced
            && pos.layers < self.config.risk.max_layers
            && snap.deviation < self.config.strategy.deviation_max;
        if !eligible {
            return;
        }

        // Layer size: half the risk-sized notional, with the recorded stop
        // (or the entry price when none is recorded) as the stop reference.
        let stop_ref = pos.stop_loss_price.unwrap_or(pos.entry_price);
        let notional = sizing::risk_notional(
            balance,
            self.config.risk.risk_per_trade,
            pos.entry_price,
            stop_ref,
            self.config.exchange.min_order_notional,
        ) * PYRAMID_LAYER_FACTOR;
        let amount = sizing::to_contracts(notional, snap.price, self.config.exchange.amount_step);
        if amount <= Decimal::ZERO {
            debug!(symbol, "pyramid layer rounds to zero, skipping");
            return;
        }

        let action = Action::OpenMarket {
            side: pos.side,
            amount,
        };

        match self.gateway.submit_market_order(symbol, pos.side, amount).await {
            Ok(_ack) => {
                info!(
                    symbol,
                    side = pos.side.as_str(),
                    %amount,
                    layers = pos.layers + 1,
                    "pyramid layer filled"
                );
                report.record(action, true);
                self.book
                    .add_layer(symbol, amount, self.config.risk.max_layers);

                // Trail the stop behind the new price.
                let trail = TRAIL_STOP_ATR_MULT * snap.atr_current;
                let new_stop = match pos.side {
                    Side::Long => snap.price - trail,
                    Side::Short => snap.price + trail,
                };
                self.relocate_stop(symbol, new_stop, report).await;
            }
            Err(e) => {
                warn!(symbol, error = %e, "pyramid order failed");
                report.record(action, false);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Entry evaluation
    // -----------------------------------------------------------------------

    async fn evaluate_entry(
        &mut self,
        symbol: &str,
        snap: &IndicatorSnapshot,
        balance: Decimal,
        report: &mut TickReport,
    ) {
        let s = &self.config.strategy;

        // Chop filter blocks all entries this tick.
        if snap.chop_cross_count >= s.chop_max_cross {
            debug!(
                symbol,
                crossings = snap.chop_cross_count,
                "choppy market, no entry"
            );
            return;
        }

        let long_signal = snap.ema_slow_current > snap.ema_macro_current
            && snap.price > snap.ema_fast_current
            && snap.slope > s.slope_min
            && snap.rsi_current < ENTRY_RSI_CEILING_LONG
            && snap.deviation < s.deviation_max;

        let short_signal = snap.ema_slow_current < snap.ema_macro_current
            && snap.price < snap.ema_fast_current
            && snap.slope < -s.slope_min
            && snap.rsi_current > ENTRY_RSI_FLOOR_SHORT
            && snap.deviation < s.deviation_max;

        let side = if long_signal {
            Side::Long
        } else if short_signal {
            Side::Short
        } else {
            return;
        };

        let stop_distance = self.config.risk.hard_sl_atr * snap.atr_current;
        let stop_price = match side {
            Side::Long => snap.price - stop_distance,
            Side::Short => snap.price + stop_distance,
        };

        let notional = sizing::risk_notional(
            balance,
            self.config.risk.risk_per_trade,
            snap.price,
            stop_price,
            self.config.exchange.min_order_notional,
        );
        let amount = sizing::to_contracts(notional, snap.price, self.config.exchange.amount_step);
        if amount <= Decimal::ZERO {
            debug!(symbol, "entry size rounds to zero, aborting entry");
            return;
        }

        info!(
            symbol,
            side = side.as_str(),
            price = %snap.price,
            %amount,
            stop = %stop_price,
            rsi = %snap.rsi_current,
            slope = %snap.slope,
            "entry signal"
        );

        let action = Action::OpenMarket { side, amount };
        match self.gateway.submit_market_order(symbol, side, amount).await {
            Ok(_ack) => {
                report.record(action, true);

                // Pick up the fresh position before attaching the stop.
                match self.gateway.get_open_position(symbol).await {
                    Ok(remote) => self.book.sync(symbol, remote),
                    Err(e) => warn!(symbol, error = %e, "post-entry sync failed"),
                }

                // A failed stop leaves the position open; the intended price
                // is still recorded locally so later ticks reason from it.
                self.place_stop(symbol, side, amount, stop_price, report).await;
            }
            Err(e) => {
                warn!(symbol, error = %e, "entry order failed");
                report.record(action, false);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Stop management
    // -----------------------------------------------------------------------

    /// Submit a reduce-only stop and record it locally. The local stop price
    /// is recorded whether or not the submission succeeds.
    async fn place_stop(
        &mut self,
        symbol: &str,
        position_side: Side,
        amount: Decimal,
        stop_price: Decimal,
        report: &mut TickReport,
    ) {
        let stop_side = position_side.opposite();
        let action = Action::PlaceStop {
            side: stop_side,
            amount,
            stop_price,
        };

        match self
            .gateway
            .submit_stop_order(symbol, stop_side, amount, stop_price)
            .await
        {
            Ok(ack) => {
                report.record(action, true);
                self.book
                    .update_stop_loss(symbol, stop_price, Some(ack.order_id));
            }
            Err(e) => {
                warn!(symbol, %stop_price, error = %e, "stop submission failed, position unprotected");
                report.record(action, false);
                self.book.update_stop_loss(symbol, stop_price, None);
            }
        }
    }

    /// Move the protective stop, cancelling any resting order first. Stops
    /// only ever move in the risk-reducing direction: a relocation that
    /// would widen risk versus the recorded stop is dropped.
    async fn relocate_stop(&mut self, symbol: &str, new_price: Decimal, report: &mut TickReport) {
        let Some(pos) = self.book.get(symbol).cloned() else {
            return;
        };

        if !tightens_stop(pos.side, pos.stop_loss_price, new_price) {
            debug!(
                symbol,
                current = ?pos.stop_loss_price,
                proposed = %new_price,
                "stop relocation would widen risk, ignored"
            );
            return;
        }

        if let Some(order_id) = pos.stop_loss_order_id.clone() {
            let cancel = Action::CancelStop {
                order_id: order_id.clone(),
            };
            match self.gateway.cancel_order(&order_id, symbol).await {
                Ok(()) => report.record(cancel, true),
                Err(e) => {
                    // Tolerated: the replacement still goes out.
                    warn!(symbol, order_id, error = %e, "resting stop cancel failed");
                    report.record(cancel, false);
                }
            }
        }

        self.place_stop(symbol, pos.side, pos.contracts, new_price, report)
            .await;
    }
}

/// Whether moving the stop to `proposed` reduces (or holds) risk for the
/// given side. With no recorded stop any price is acceptable.
fn tightens_stop(side: Side, current: Option<Decimal>, proposed: Decimal) -> bool {
    match (side, current) {
        (_, None) => true,
        (Side::Long, Some(cur)) => proposed >= cur,
        (Side::Short, Some(cur)) => proposed <= cur,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
