//! Open positions and completed trade records.

use chrono::NaiveDateTime;
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    Stop,
    Target,
    Time,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "SIGNAL"),
            ExitReason::Stop => write!(f, "STOP"),
            ExitReason::Target => write!(f, "TARGET"),
            ExitReason::Time => write!(f, "TIME"),
        }
    }
}

/// The single open long holding. Closed positions live on only as
/// [`TradeRecord`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_index: usize,
    pub entry_timestamp: NaiveDateTime,
    pub entry_price: f64,
    pub quantity: u64,
    pub stop_price: f64,
    /// Profit target; `None` when targets are disabled.
    pub target_price: Option<f64>,
    pub entry_commission: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }

    /// Bars held as of bar `index`, counting the entry bar as zero.
    pub fn bars_held(&self, index: usize) -> usize {
        index.saturating_sub(self.entry_index)
    }

    /// Consumes the position into its immutable trade record.
    pub fn close(
        self,
        exit_index: usize,
        exit_timestamp: NaiveDateTime,
        exit_price: f64,
        exit_commission: f64,
        exit_reason: ExitReason,
    ) -> TradeRecord {
        let gross = self.unrealized_pnl(exit_price);
        TradeRecord {
            entry_timestamp: self.entry_timestamp,
            exit_timestamp,
            entry_price: self.entry_price,
            exit_price,
            quantity: self.quantity,
            commission: self.entry_commission + exit_commission,
            pnl: gross - self.entry_commission - exit_commission,
            exit_reason,
            bars_held: self.bars_held(exit_index),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub entry_timestamp: NaiveDateTime,
    pub exit_timestamp: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: u64,
    /// Entry plus exit commission.
    pub commission: f64,
    /// Realized, net of commission.
    pub pnl: f64,
    pub exit_reason: ExitReason,
    pub bars_held: usize,
}

impl TradeRecord {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn return_pct(&self) -> f64 {
        let cost = self.entry_price * self.quantity as f64;
        if cost > 0.0 { self.pnl / cost } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_position() -> Position {
        Position {
            entry_index: 3,
            entry_timestamp: ts(4),
            entry_price: 50.0,
            quantity: 100,
            stop_price: 45.0,
            target_price: Some(60.0),
            entry_commission: 5.0,
        }
    }

    #[test]
    fn market_value_and_unrealized_pnl() {
        let pos = sample_position();
        assert!((pos.market_value(55.0) - 5500.0).abs() < f64::EPSILON);
        assert!((pos.unrealized_pnl(55.0) - 500.0).abs() < f64::EPSILON);
        assert!((pos.unrealized_pnl(45.0) + 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bars_held_counts_from_entry() {
        let pos = sample_position();
        assert_eq!(pos.bars_held(3), 0);
        assert_eq!(pos.bars_held(10), 7);
    }

    #[test]
    fn close_nets_both_commissions() {
        let trade = sample_position().close(8, ts(9), 60.0, 6.0, ExitReason::Signal);
        assert_eq!(trade.entry_timestamp, ts(4));
        assert_eq!(trade.exit_timestamp, ts(9));
        assert_eq!(trade.quantity, 100);
        assert_eq!(trade.bars_held, 5);
        assert!((trade.commission - 11.0).abs() < f64::EPSILON);
        assert!((trade.pnl - (1000.0 - 11.0)).abs() < 1e-9);
        assert!(trade.is_win());
    }

    #[test]
    fn losing_trade_is_not_a_win() {
        let trade = sample_position().close(5, ts(6), 44.0, 0.0, ExitReason::Stop);
        assert!(!trade.is_win());
        assert!((trade.return_pct() - (-605.0 / 5000.0)).abs() < 1e-12);
    }

    #[test]
    fn exit_reason_display() {
        assert_eq!(ExitReason::Signal.to_string(), "SIGNAL");
        assert_eq!(ExitReason::Stop.to_string(), "STOP");
        assert_eq!(ExitReason::Target.to_string(), "TARGET");
        assert_eq!(ExitReason::Time.to_string(), "TIME");
    }
}
