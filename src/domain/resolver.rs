//! Forward scan from an accepted setup to its first exit.
//!
//! The scan starts on the bar after the setup bar and stops at the first bar
//! that touches the stop or the target. A bar touching both is settled by the
//! strategy's [`SameBarPolicy`]. Reaching the end of the stream without an
//! exit is a normal outcome: the setup is dropped and the caller resumes on
//! the bar after the setup.

use std::fmt;

use super::bar::IndicatorBar;
use super::signal::{Direction, TradeSetup};
use super::sizing::PositionSize;
use super::strategy::{SameBarPolicy, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::TakeProfit => write!(f, "take_profit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Exit {
        exit_index: usize,
        reason: ExitReason,
        pnl: f64,
    },
    /// The stream ended before the stop or target was touched.
    Unresolved,
}

impl Resolution {
    /// Cursor position to continue setup detection from. Bars consumed by a
    /// resolved trade are never re-scanned; an unresolved scan is discarded.
    pub fn resume_index(&self, setup_index: usize) -> usize {
        match self {
            Resolution::Exit { exit_index, .. } => exit_index + 1,
            Resolution::Unresolved => setup_index + 1,
        }
    }
}

/// Which exits a single bar touches for the given setup.
fn touches(bar: &IndicatorBar, setup: &TradeSetup) -> (bool, bool) {
    match setup.direction {
        Direction::Long => (bar.low <= setup.stop_price, bar.high >= setup.target_price),
        Direction::Short => (bar.high >= setup.stop_price, bar.low <= setup.target_price),
    }
}

fn exit_for(stop_hit: bool, target_hit: bool, policy: SameBarPolicy) -> Option<ExitReason> {
    match (stop_hit, target_hit) {
        (true, true) => Some(match policy {
            SameBarPolicy::StopFirst => ExitReason::StopLoss,
            SameBarPolicy::TargetFirst => ExitReason::TakeProfit,
        }),
        (true, false) => Some(ExitReason::StopLoss),
        (false, true) => Some(ExitReason::TakeProfit),
        (false, false) => None,
    }
}

pub fn resolve_trade(
    bars: &[IndicatorBar],
    setup_index: usize,
    setup: &TradeSetup,
    size: &PositionSize,
    strategy: &Strategy,
) -> Resolution {
    for (exit_index, bar) in bars.iter().enumerate().skip(setup_index + 1) {
        let (stop_hit, target_hit) = touches(bar, setup);
        if let Some(reason) = exit_for(stop_hit, target_hit, strategy.same_bar_policy) {
            let pnl = match reason {
                ExitReason::StopLoss => -size.risk_amount,
                ExitReason::TakeProfit => size.risk_amount * strategy.reward_risk_ratio,
            };
            return Resolution::Exit {
                exit_index,
                reason,
                pnl,
            };
        }
    }
    Resolution::Unresolved
}
