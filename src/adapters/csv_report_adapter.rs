//! CSV report adapter: trade ledger, equity series and annotated bars.
//!
//! Floats are written with their shortest round-trip representation, so an
//! annotated file loads back into exactly the same bar stream.

use std::path::{Path, PathBuf};

use csv::Writer;

use crate::domain::backtest::BacktestResult;
use crate::domain::bar::IndicatorBar;
use crate::domain::error::TrendangleError;
use crate::ports::report_port::ReportPort;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TRADE_HEADER: [&str; 12] = [
    "entry_time",
    "exit_time",
    "direction",
    "entry_price",
    "stop_price",
    "target_price",
    "position_size",
    "exit_reason",
    "pnl",
    "balance_after",
    "entry_index",
    "exit_index",
];

const EQUITY_HEADER: [&str; 4] = ["exit_time", "balance", "peak", "drawdown"];

const BAR_HEADER: [&str; 12] = [
    "timestamp",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "fast_trend",
    "slow_trend",
    "volatility",
    "fast_angle",
    "slow_angle",
    "angle_spread",
];

fn open_writer(path: &Path) -> Result<Writer<std::fs::File>, TrendangleError> {
    Writer::from_path(path).map_err(|e| TrendangleError::Io(e.into()))
}

fn write_row<I, S>(wtr: &mut Writer<std::fs::File>, row: I) -> Result<(), TrendangleError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    wtr.write_record(row).map_err(|e| TrendangleError::Io(e.into()))
}

/// Write `trades.csv`, one row per closed trade.
pub fn write_trades(result: &BacktestResult, path: &Path) -> Result<(), TrendangleError> {
    let mut wtr = open_writer(path)?;
    write_row(&mut wtr, TRADE_HEADER)?;
    for t in result.ledger.trades() {
        write_row(
            &mut wtr,
            [
                t.entry_time.format(TIMESTAMP_FORMAT).to_string(),
                t.exit_time.format(TIMESTAMP_FORMAT).to_string(),
                t.direction.to_string(),
                t.entry_price.to_string(),
                t.stop_price.to_string(),
                t.target_price.to_string(),
                t.position_size.to_string(),
                t.exit_reason.to_string(),
                t.pnl.to_string(),
                t.balance_after.to_string(),
                t.entry_index.to_string(),
                t.exit_index.to_string(),
            ],
        )?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `equity.csv`: balance, running peak and drawdown after each trade.
pub fn write_equity(result: &BacktestResult, path: &Path) -> Result<(), TrendangleError> {
    let mut wtr = open_writer(path)?;
    write_row(&mut wtr, EQUITY_HEADER)?;
    for p in result.ledger.equity_curve() {
        write_row(
            &mut wtr,
            [
                p.exit_time.format(TIMESTAMP_FORMAT).to_string(),
                p.balance.to_string(),
                p.peak.to_string(),
                p.drawdown.to_string(),
            ],
        )?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write an indicator bar stream in the layout the CSV data adapter reads
/// back in precomputed mode.
pub fn write_indicator_bars(bars: &[IndicatorBar], path: &Path) -> Result<(), TrendangleError> {
    let mut wtr = open_writer(path)?;
    write_row(&mut wtr, BAR_HEADER)?;
    for b in bars {
        write_row(
            &mut wtr,
            [
                b.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                b.open.to_string(),
                b.high.to_string(),
                b.low.to_string(),
                b.close.to_string(),
                b.volume.to_string(),
                b.fast_trend.to_string(),
                b.slow_trend.to_string(),
                b.volatility.to_string(),
                b.fast_angle.to_string(),
                b.slow_angle.to_string(),
                b.angle_spread.to_string(),
            ],
        )?;
    }
    wtr.flush()?;
    Ok(())
}

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        _bars: &[IndicatorBar],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, TrendangleError> {
        let trades = output_dir.join("trades.csv");
        write_trades(result, &trades)?;
        let equity = output_dir.join("equity.csv");
        write_equity(result, &equity)?;
        Ok(vec![trades, equity])
    }
}
