//! Trade ledger, running balance and derived equity/drawdown series.

use chrono::NaiveDateTime;

use super::resolver::ExitReason;
use super::signal::Direction;

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
    pub position_size: f64,
    pub exit_reason: ExitReason,
    pub pnl: f64,
    /// Assigned by [`Ledger::append`].
    pub balance_after: f64,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index - self.entry_index
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub exit_time: NaiveDateTime,
    pub balance: f64,
    pub peak: f64,
    /// balance - peak, never positive.
    pub drawdown: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    initial_balance: f64,
    balance: f64,
    trades: Vec<Trade>,
}

impl Ledger {
    pub fn new(initial_balance: f64) -> Self {
        Ledger {
            initial_balance,
            balance: initial_balance,
            trades: Vec::new(),
        }
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// Settle a closed trade: apply its P/L and stamp the resulting balance.
    pub fn append(&mut self, mut trade: Trade) -> &Trade {
        self.balance += trade.pnl;
        trade.balance_after = self.balance;
        self.trades.push(trade);
        &self.trades[self.trades.len() - 1]
    }

    /// Peak and drawdown after each trade, by prefix-max over `balance_after`.
    pub fn equity_curve(&self) -> Vec<EquityPoint> {
        let mut peak = f64::NEG_INFINITY;
        self.trades
            .iter()
            .map(|trade| {
                peak = peak.max(trade.balance_after);
                EquityPoint {
                    exit_time: trade.exit_time,
                    balance: trade.balance_after,
                    peak,
                    drawdown: trade.balance_after - peak,
                }
            })
            .collect()
    }

    /// Fraction of winning trades, `None` with no trades.
    pub fn win_rate(&self) -> Option<f64> {
        if self.trades.is_empty() {
            return None;
        }
        let wins = self.trades.iter().filter(|t| t.is_win()).count();
        Some(wins as f64 / self.trades.len() as f64)
    }

    /// Mean P/L per trade, `None` with no trades.
    pub fn expectancy(&self) -> Option<f64> {
        if self.trades.is_empty() {
            return None;
        }
        let total: f64 = self.trades.iter().map(|t| t.pnl).sum();
        Some(total / self.trades.len() as f64)
    }

    /// Deepest drawdown in currency (zero or negative), `None` with no trades.
    pub fn max_drawdown(&self) -> Option<f64> {
        self.equity_curve()
            .iter()
            .map(|p| p.drawdown)
            .reduce(f64::min)
    }
}
