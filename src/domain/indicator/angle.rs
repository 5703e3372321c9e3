//! ATR-normalised trend angle.
//!
//! slope = (EMA[i] - EMA[i-lookback]) / lookback / ATR[i]
//! angle = atan(slope) in degrees, so it stays inside (-90, 90).
//! Valid once both the lookback and the ATR are available. A zero ATR means
//! a flat market and gives a zero angle.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};

pub fn calculate_angle(
    ema: &IndicatorSeries,
    atr: &IndicatorSeries,
    lookback: usize,
) -> IndicatorSeries {
    let ema_period = match ema.indicator_type {
        IndicatorType::Ema(period) => period,
        _ => 0,
    };
    let indicator_type = IndicatorType::Angle {
        ema_period,
        lookback,
    };

    if lookback == 0 || ema.values.len() != atr.values.len() {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let values = ema
        .values
        .iter()
        .zip(&atr.values)
        .enumerate()
        .map(|(i, (point, vol))| {
            let valid = i >= lookback && point.valid && vol.valid && ema.values[i - lookback].valid;
            let value = if !valid {
                0.0
            } else if vol.value > 0.0 {
                let slope = (point.value - ema.values[i - lookback].value) / lookback as f64;
                (slope / vol.value).atan().to_degrees()
            } else {
                0.0
            };
            IndicatorPoint {
                timestamp: point.timestamp,
                valid,
                value,
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
