//! Simulation state and equity tracking.
//!
//! One `SimulationState` belongs to exactly one run. It holds at most one
//! open position; every close appends exactly one trade record.

use chrono::NaiveDateTime;

use super::position::{ExitReason, Position, TradeRecord};
use super::signal::MarketState;
use super::sizing::{calculate_commission, SizedEntry};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub cash: f64,
    pub position_value: f64,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub cash: f64,
    pub initial_cash: f64,
    pub position: Option<Position>,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

impl SimulationState {
    pub fn new(initial_cash: f64) -> Self {
        SimulationState {
            cash: initial_cash,
            initial_cash,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Logical state for the signal generator as of bar `index`.
    pub fn market_state(&self, index: usize) -> MarketState {
        match &self.position {
            Some(pos) => MarketState::Long {
                stop_price: pos.stop_price,
                target_price: pos.target_price,
                bars_held: pos.bars_held(index),
            },
            None => MarketState::Flat,
        }
    }

    /// Opens a position from a sized entry. Returns `false`, leaving the
    /// state untouched, if a position is already open or cash cannot cover
    /// the fill.
    pub fn open_position(
        &mut self,
        index: usize,
        timestamp: NaiveDateTime,
        entry: &SizedEntry,
    ) -> bool {
        if self.position.is_some() || entry.total_cost() > self.cash {
            return false;
        }
        self.cash -= entry.total_cost();
        self.position = Some(Position {
            entry_index: index,
            entry_timestamp: timestamp,
            entry_price: entry.entry_price,
            quantity: entry.quantity,
            stop_price: entry.stop_price,
            target_price: entry.target_price,
            entry_commission: entry.commission,
        });
        true
    }

    /// Closes the open position at `price`, crediting proceeds net of
    /// commission. Returns the appended trade record.
    pub fn close_position(
        &mut self,
        index: usize,
        timestamp: NaiveDateTime,
        price: f64,
        commission_rate: f64,
        reason: ExitReason,
    ) -> Option<&TradeRecord> {
        let position = self.position.take()?;
        let proceeds = position.market_value(price);
        let commission = calculate_commission(proceeds, commission_rate);
        self.cash += proceeds - commission;
        self.trades
            .push(position.close(index, timestamp, price, commission, reason));
        self.trades.last()
    }

    pub fn position_value(&self, price: f64) -> f64 {
        self.position
            .as_ref()
            .map(|pos| pos.market_value(price))
            .unwrap_or(0.0)
    }

    /// Marks the position to `close` and appends one equity point.
    pub fn record_equity(&mut self, timestamp: NaiveDateTime, close: f64) {
        let position_value = self.position_value(close);
        self.equity_curve.push(EquityPoint {
            timestamp,
            cash: self.cash,
            position_value,
            equity: self.cash + position_value,
        });
    }
}
