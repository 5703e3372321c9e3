//! Summary statistics derived from the ledger.

use super::ledger::Ledger;

/// Statistics that only exist once at least one trade has closed.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub expectancy: f64,
    /// Currency, zero or negative.
    pub max_drawdown: f64,
    pub total_return: f64,
    pub profit_factor: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_bars_held: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub trade_count: usize,
    /// `None` means no trades were taken.
    pub stats: Option<TradeStats>,
}

impl Summary {
    pub fn compute(ledger: &Ledger) -> Self {
        let initial_balance = ledger.initial_balance();
        let final_balance = ledger.balance();
        let trades = ledger.trades();

        let stats = match (ledger.win_rate(), ledger.expectancy(), ledger.max_drawdown()) {
            (Some(win_rate), Some(expectancy), Some(max_drawdown)) => {
                let mut wins = 0usize;
                let mut losses = 0usize;
                let mut gross_profit = 0.0_f64;
                let mut gross_loss = 0.0_f64;
                let mut largest_win = 0.0_f64;
                let mut largest_loss = 0.0_f64;

                for trade in trades {
                    if trade.pnl > 0.0 {
                        wins += 1;
                        gross_profit += trade.pnl;
                        largest_win = largest_win.max(trade.pnl);
                    } else if trade.pnl < 0.0 {
                        losses += 1;
                        gross_loss += trade.pnl.abs();
                        largest_loss = largest_loss.max(trade.pnl.abs());
                    }
                }

                let profit_factor = if gross_loss > 0.0 {
                    gross_profit / gross_loss
                } else if gross_profit > 0.0 {
                    f64::INFINITY
                } else {
                    0.0
                };

                let total_return = if initial_balance > 0.0 {
                    (final_balance - initial_balance) / initial_balance
                } else {
                    0.0
                };

                let held: usize = trades.iter().map(|t| t.bars_held()).sum();

                Some(TradeStats {
                    wins,
                    losses,
                    win_rate,
                    expectancy,
                    max_drawdown,
                    total_return,
                    profit_factor,
                    largest_win,
                    largest_loss,
                    avg_bars_held: held as f64 / trades.len() as f64,
                })
            }
            _ => None,
        };

        Summary {
            initial_balance,
            final_balance,
            trade_count: trades.len(),
            stats,
        }
    }
}
