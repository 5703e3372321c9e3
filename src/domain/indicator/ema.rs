//! Exponential Moving Average over close.
//!
//! k = 2/(n+1), seeded with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Every bar is valid; there is no SMA warm-up.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_ema(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values: Vec::new(),
        };
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = bars[0].close;

    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i > 0 {
                ema = bar.close * k + ema * (1.0 - k);
            }
            IndicatorPoint {
                timestamp: bar.timestamp,
                valid: true,
                value: ema,
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}
