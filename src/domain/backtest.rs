//! Backtest driver: walks the bar stream with a single cursor.
//!
//! At each cursor position the detector looks for a setup. A valid setup is
//! sized from the current balance and resolved by a forward scan; the
//! resolution decides where the cursor resumes. Only one position is ever
//! open, since bars consumed by a trade are skipped.

use tracing::{debug, info};

use super::bar::{validate_stream, IndicatorBar};
use super::error::TrendangleError;
use super::ledger::{Ledger, Trade};
use super::resolver::{resolve_trade, Resolution};
use super::signal::detect_setup;
use super::sizing::size_position;
use super::strategy::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_balance: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_balance: 10_000.0,
        }
    }
}

/// Counters describing what the scan saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub bars: usize,
    pub setups: usize,
    /// Setups with no distance between entry and stop.
    pub rejected_setups: usize,
    /// Setups whose stop and target were never touched before the stream ended.
    pub unresolved_setups: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub ledger: Ledger,
    pub scan: ScanStats,
}

pub fn run_backtest(
    bars: &[IndicatorBar],
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, TrendangleError> {
    validate_stream(bars)?;

    let mut ledger = Ledger::new(config.initial_balance);
    let mut scan = ScanStats {
        bars: bars.len(),
        ..ScanStats::default()
    };

    let mut cursor = 0;
    while cursor + 1 < bars.len() {
        let bar = &bars[cursor];
        let Some(setup) = detect_setup(bar, strategy) else {
            cursor += 1;
            continue;
        };
        scan.setups += 1;

        if !setup.is_valid() {
            debug!(index = cursor, direction = %setup.direction, "zero-risk setup rejected");
            scan.rejected_setups += 1;
            cursor += 1;
            continue;
        }

        let size = size_position(ledger.balance(), setup.risk_per_unit(), strategy.risk_fraction);
        let resolution = resolve_trade(bars, cursor, &setup, &size, strategy);

        if let Resolution::Exit {
            exit_index,
            reason,
            pnl,
        } = resolution
        {
            let trade = ledger.append(Trade {
                entry_index: cursor,
                exit_index,
                entry_time: bar.timestamp,
                exit_time: bars[exit_index].timestamp,
                direction: setup.direction,
                entry_price: setup.entry_price,
                stop_price: setup.stop_price,
                target_price: setup.target_price,
                position_size: size.position_size,
                exit_reason: reason,
                pnl,
                balance_after: ledger.balance(),
            });
            debug!(
                entry = %trade.entry_time,
                exit = %trade.exit_time,
                direction = %trade.direction,
                reason = %trade.exit_reason,
                pnl = trade.pnl,
                balance = trade.balance_after,
                "trade closed"
            );
        } else {
            debug!(index = cursor, direction = %setup.direction, "setup never resolved, dropped");
            scan.unresolved_setups += 1;
        }

        cursor = resolution.resume_index(cursor);
    }

    info!(
        bars = scan.bars,
        setups = scan.setups,
        trades = ledger.len(),
        rejected = scan.rejected_setups,
        unresolved = scan.unresolved_setups,
        "backtest complete"
    );

    Ok(BacktestResult { ledger, scan })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resolver::ExitReason;
    use crate::domain::signal::Direction;
    use chrono::{Duration, NaiveDate};

    fn flat(i: i64, high: f64, low: f64) -> IndicatorBar {
        let mid = (high + low) / 2.0;
        IndicatorBar {
            timestamp: NaiveDate::from_ymd_opt(2024, 7, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
                + Duration::minutes(5 * i),
            open: mid,
            high,
            low,
            close: mid,
            volume: 1.0,
            fast_trend: 100.0,
            slow_trend: 100.0,
            volatility: 1.0,
            fast_angle: 0.0,
            slow_angle: 0.0,
            angle_spread: 0.0,
        }
    }

    /// Long setup: close 100, low 98 → stop 98, target 104 at rr 2.
    fn long_signal(i: i64) -> IndicatorBar {
        IndicatorBar {
            open: 99.0,
            high: 100.5,
            low: 98.0,
            close: 100.0,
            fast_trend: 100.2,
            slow_trend: 99.8,
            fast_angle: 45.0,
            slow_angle: 35.0,
            angle_spread: 10.0,
            ..flat(i, 100.5, 98.0)
        }
    }

    #[test]
    fn empty_stream_has_no_trades() {
        let result = run_backtest(&[], &Strategy::default(), &BacktestConfig::default()).unwrap();
        assert!(result.ledger.is_empty());
        assert_eq!(result.scan, ScanStats::default());
    }

    #[test]
    fn single_losing_trade() {
        let bars = vec![long_signal(0), flat(1, 99.0, 97.0)];
        let result = run_backtest(&bars, &Strategy::default(), &BacktestConfig::default()).unwrap();

        let trades = result.ledger.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].direction, Direction::Long);
        assert_eq!(trades[0].exit_reason, ExitReason::StopLoss);
        assert!((trades[0].pnl + 100.0).abs() < f64::EPSILON);
        assert!((trades[0].balance_after - 9_900.0).abs() < f64::EPSILON);
        assert!((trades[0].position_size - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cursor_resumes_after_exit_bar() {
        // the exit bar is itself a signal bar but must not open a trade
        let mut exit_bar = long_signal(1);
        exit_bar.high = 104.0;
        let bars = vec![long_signal(0), exit_bar, flat(2, 200.0, 1.0)];
        let result = run_backtest(&bars, &Strategy::default(), &BacktestConfig::default()).unwrap();
        assert_eq!(result.ledger.len(), 1);
        assert_eq!(result.ledger.trades()[0].exit_index, 1);
        assert_eq!(result.scan.setups, 1);
    }

    #[test]
    fn second_trade_sized_from_updated_balance() {
        let bars = vec![
            long_signal(0),
            flat(1, 105.0, 99.0),
            long_signal(2),
            flat(3, 99.0, 97.0),
        ];
        let result = run_backtest(&bars, &Strategy::default(), &BacktestConfig::default()).unwrap();
        let trades = result.ledger.trades();
        assert_eq!(trades.len(), 2);
        assert!((trades[0].pnl - 200.0).abs() < 1e-9);
        // 1% of 10200
        assert!((trades[1].pnl + 102.0).abs() < 1e-9);
        assert!((result.ledger.balance() - 10_098.0).abs() < 1e-9);
    }

    #[test]
    fn unresolved_setup_resumes_on_next_bar() {
        // stop 99.5, target 104: tighter than the first setup
        let inner = IndicatorBar {
            open: 100.0,
            high: 101.5,
            low: 99.5,
            close: 101.0,
            ..long_signal(1)
        };
        let bars = vec![long_signal(0), inner, flat(2, 100.0, 99.0)];
        let result = run_backtest(&bars, &Strategy::default(), &BacktestConfig::default()).unwrap();

        assert_eq!(result.scan.setups, 2);
        assert_eq!(result.scan.unresolved_setups, 1);
        let trades = result.ledger.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_index, 1);
        assert_eq!(trades[0].exit_index, 2);
        assert_eq!(trades[0].exit_reason, ExitReason::StopLoss);
    }

    #[test]
    fn zero_risk_setup_is_counted_and_skipped() {
        let doji = IndicatorBar {
            open: 99.0,
            close: 98.0,
            ..long_signal(0)
        };
        let bars = vec![doji, flat(1, 99.0, 90.0)];
        let result = run_backtest(&bars, &Strategy::default(), &BacktestConfig::default()).unwrap();
        assert!(result.ledger.is_empty());
        assert_eq!(result.scan.rejected_setups, 1);
        assert!((result.ledger.balance() - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_stream_is_rejected_before_simulation() {
        let bars = vec![long_signal(1), flat(0, 99.0, 97.0)];
        let err = run_backtest(&bars, &Strategy::default(), &BacktestConfig::default())
            .unwrap_err();
        assert!(matches!(err, TrendangleError::MalformedStream { index: 1, .. }));
    }
}
