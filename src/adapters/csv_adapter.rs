//! CSV file data adapter.
//!
//! Columns are located by header name, so order is free and extra columns
//! are ignored. Raw files need `timestamp, open, high, low, close, volume`;
//! precomputed files add the six indicator columns written by `annotate`.

use crate::domain::bar::IndicatorBar;
use crate::domain::error::TrendangleError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{StringRecord, Trim};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const OHLCV_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];
const INDICATOR_COLUMNS: [&str; 6] = [
    "fast_trend",
    "slow_trend",
    "volatility",
    "fast_angle",
    "slow_angle",
    "angle_spread",
];

const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp in any of the accepted layouts. Offsets are converted
/// to UTC; naive timestamps are taken as UTC already.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn data_err(reason: impl Into<String>) -> TrendangleError {
    TrendangleError::DataSource {
        reason: reason.into(),
    }
}

/// Header name → column index.
struct Columns(HashMap<String, usize>);

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        Columns(
            headers
                .iter()
                .enumerate()
                .map(|(i, name)| (name.trim().to_lowercase(), i))
                .collect(),
        )
    }

    fn index(&self, name: &str) -> Result<usize, TrendangleError> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| data_err(format!("missing {} column", name)))
    }
}

/// One parsed data row: the timestamp plus the requested numeric columns.
struct Row {
    timestamp: NaiveDateTime,
    values: Vec<f64>,
}

fn in_range(ts: NaiveDateTime, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    let date = ts.date();
    start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
}

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read every row, keeping the timestamp and the named numeric columns
    /// in order. Line numbers in errors count the header as line 1.
    fn read_rows(
        &self,
        numeric: &[&str],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Row>, TrendangleError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            data_err(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| data_err(format!("CSV header error: {}", e)))?;
        let columns = Columns::from_headers(headers);
        let ts_index = columns.index("timestamp")?;
        let indices = numeric
            .iter()
            .map(|name| columns.index(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::new();
        for (n, result) in rdr.records().enumerate() {
            let line = n + 2;
            let record = result.map_err(|e| data_err(format!("CSV parse error: {}", e)))?;

            let raw_ts = record
                .get(ts_index)
                .ok_or_else(|| data_err(format!("line {}: missing timestamp", line)))?;
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| {
                data_err(format!("line {}: invalid timestamp '{}'", line, raw_ts))
            })?;
            if !in_range(timestamp, start, end) {
                continue;
            }

            let values = indices
                .iter()
                .zip(numeric)
                .map(|(&i, name)| {
                    let raw = record
                        .get(i)
                        .ok_or_else(|| data_err(format!("line {}: missing {}", line, name)))?;
                    raw.parse::<f64>().map_err(|e| {
                        data_err(format!("line {}: invalid {} value '{}': {}", line, name, raw, e))
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;

            rows.push(Row { timestamp, values });
        }

        debug!(path = %self.path.display(), rows = rows.len(), "csv loaded");
        Ok(rows)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, TrendangleError> {
        let rows = self.read_rows(&OHLCV_COLUMNS, start_date, end_date)?;
        let total = rows.len();
        let mut bars: Vec<OhlcvBar> = rows
            .into_iter()
            .filter(|row| row.values.iter().all(|v| v.is_finite()))
            .map(|row| OhlcvBar {
                timestamp: row.timestamp,
                open: row.values[0],
                high: row.values[1],
                low: row.values[2],
                close: row.values[3],
                volume: row.values[4],
            })
            .collect();
        if bars.len() < total {
            debug!(dropped = total - bars.len(), "skipped rows with non-finite prices");
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn fetch_indicator_bars(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<IndicatorBar>, TrendangleError> {
        let names: Vec<&str> = OHLCV_COLUMNS
            .iter()
            .chain(INDICATOR_COLUMNS.iter())
            .copied()
            .collect();
        let rows = self.read_rows(&names, start_date, end_date)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let v = &row.values;
                IndicatorBar {
                    timestamp: row.timestamp,
                    open: v[0],
                    high: v[1],
                    low: v[2],
                    close: v[3],
                    volume: v[4],
                    fast_trend: v[5],
                    slow_trend: v[6],
                    volatility: v[7],
                    fast_angle: v[8],
                    slow_angle: v[9],
                    angle_spread: v[10],
                }
            })
            .collect())
    }

    fn get_data_range(
        &self,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, TrendangleError> {
        let rows = self.read_rows(&[], None, None)?;
        let first = rows.iter().map(|r| r.timestamp).min();
        let last = rows.iter().map(|r| r.timestamp).max();
        Ok(first.zip(last).map(|(first, last)| (first, last, rows.len())))
    }
}
