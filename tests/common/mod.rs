#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
pub use trendangle::domain::bar::IndicatorBar;
use trendangle::domain::error::TrendangleError;
pub use trendangle::domain::ohlcv::OhlcvBar;
use trendangle::domain::strategy::Strategy;
use trendangle::ports::data_port::DataPort;

/// In-memory data source. Date filters are applied like the CSV adapter.
pub struct MockDataPort {
    pub raw: Vec<OhlcvBar>,
    pub annotated: Vec<IndicatorBar>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            raw: Vec::new(),
            annotated: Vec::new(),
            error: None,
        }
    }

    pub fn with_raw(mut self, bars: Vec<OhlcvBar>) -> Self {
        self.raw = bars;
        self
    }

    pub fn with_annotated(mut self, bars: Vec<IndicatorBar>) -> Self {
        self.annotated = bars;
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }

    fn check(&self) -> Result<(), TrendangleError> {
        match &self.error {
            Some(reason) => Err(TrendangleError::DataSource {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn in_range(ts: NaiveDateTime, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.is_none_or(|s| ts.date() >= s) && end.is_none_or(|e| ts.date() <= e)
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, TrendangleError> {
        self.check()?;
        Ok(self
            .raw
            .iter()
            .filter(|b| in_range(b.timestamp, start_date, end_date))
            .cloned()
            .collect())
    }

    fn fetch_indicator_bars(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<IndicatorBar>, TrendangleError> {
        self.check()?;
        Ok(self
            .annotated
            .iter()
            .filter(|b| in_range(b.timestamp, start_date, end_date))
            .cloned()
            .collect())
    }

    fn get_data_range(
        &self,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, TrendangleError> {
        self.check()?;
        Ok(self
            .raw
            .first()
            .zip(self.raw.last())
            .map(|(f, l)| (f.timestamp, l.timestamp, self.raw.len())))
    }
}

/// Five-minute grid starting 2024-01-02 07:00.
pub fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(7, 0, 0)
        .unwrap()
        + Duration::minutes(5 * i as i64)
}

/// A bar that never signals: flat EMAs and angles.
pub fn flat(i: usize, high: f64, low: f64) -> IndicatorBar {
    let mid = (high + low) / 2.0;
    IndicatorBar {
        timestamp: ts(i),
        open: mid,
        high,
        low,
        close: mid,
        volume: 1.0,
        fast_trend: mid,
        slow_trend: mid,
        volatility: high - low,
        fast_angle: 0.0,
        slow_angle: 0.0,
        angle_spread: 0.0,
    }
}

/// LONG setup under the default strategy: entry 100, stop 98, target 104.
pub fn long_signal(i: usize) -> IndicatorBar {
    IndicatorBar {
        timestamp: ts(i),
        open: 99.0,
        high: 100.5,
        low: 98.0,
        close: 100.0,
        volume: 1.0,
        fast_trend: 100.2,
        slow_trend: 99.8,
        volatility: 1.0,
        fast_angle: 45.0,
        slow_angle: 35.0,
        angle_spread: 10.0,
    }
}

/// SHORT setup under the default strategy: entry 100, stop 102, target 96.
pub fn short_signal(i: usize) -> IndicatorBar {
    IndicatorBar {
        timestamp: ts(i),
        open: 101.0,
        high: 102.0,
        low: 99.5,
        close: 100.0,
        volume: 1.0,
        fast_trend: 99.8,
        slow_trend: 100.2,
        volatility: 1.0,
        fast_angle: -45.0,
        slow_angle: -35.0,
        angle_spread: 10.0,
    }
}

/// Re-stamp bars onto a contiguous timestamp grid.
pub fn sequence(mut bars: Vec<IndicatorBar>) -> Vec<IndicatorBar> {
    for (i, bar) in bars.iter_mut().enumerate() {
        bar.timestamp = ts(i);
    }
    bars
}

pub fn default_strategy() -> Strategy {
    Strategy::default()
}

/// One-minute gold-like bars over a trading day, trending up then down.
pub fn minute_bars(count: usize) -> Vec<OhlcvBar> {
    let start = NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap();
    (0..count)
        .map(|i| {
            let t = i as f64;
            let close = 2000.0 + 8.0 * (t / 45.0).sin() + t * 0.01;
            let open = close - 0.2 * (t / 7.0).cos();
            OhlcvBar {
                timestamp: start + Duration::minutes(i as i64),
                open,
                high: open.max(close) + 0.3,
                low: open.min(close) - 0.3,
                close,
                volume: 5.0 + (i % 7) as f64,
            }
        })
        .collect()
}
