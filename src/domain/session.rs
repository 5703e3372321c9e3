//! Trading-session filter and N-minute resampling of raw bars.

use chrono::{DateTime, NaiveDateTime, Timelike};

use super::ohlcv::OhlcvBar;

/// Inclusive range of hours-of-day to keep. The default covers the London
/// and New York sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for SessionWindow {
    fn default() -> Self {
        SessionWindow {
            start_hour: 7,
            end_hour: 20,
        }
    }
}

impl SessionWindow {
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        let hour = timestamp.hour();
        hour >= self.start_hour && hour <= self.end_hour
    }
}

pub fn filter_session(bars: Vec<OhlcvBar>, window: &SessionWindow) -> Vec<OhlcvBar> {
    bars.into_iter()
        .filter(|bar| window.contains(bar.timestamp))
        .collect()
}

fn bucket_start(timestamp: NaiveDateTime, minutes: u32) -> NaiveDateTime {
    let width = i64::from(minutes) * 60;
    let secs = timestamp.and_utc().timestamp();
    let floored = secs - secs.rem_euclid(width);
    DateTime::from_timestamp(floored, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or(timestamp)
}

/// Aggregate time-ordered bars into `minutes`-wide buckets aligned to the
/// Unix epoch: first open, max high, min low, last close, summed volume.
/// Buckets with no input bars are not emitted. `minutes == 0` returns the
/// input unchanged.
pub fn resample(bars: &[OhlcvBar], minutes: u32) -> Vec<OhlcvBar> {
    if minutes == 0 {
        return bars.to_vec();
    }

    let mut out: Vec<OhlcvBar> = Vec::new();
    for bar in bars {
        let start = bucket_start(bar.timestamp, minutes);
        match out.last_mut() {
            Some(current) if current.timestamp == start => {
                current.high = current.high.max(bar.high);
                current.low = current.low.min(bar.low);
                current.close = bar.close;
                current.volume += bar.volume;
            }
            _ => out.push(OhlcvBar {
                timestamp: start,
                ..bar.clone()
            }),
        }
    }
    out
}
