//! Annotating raw bars with the trend indicators the engine consumes.

use tracing::debug;

use crate::domain::bar::IndicatorBar;
use crate::domain::indicator::angle::calculate_angle;
use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub volatility_period: usize,
    pub slope_lookback: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            fast_period: 9,
            slow_period: 20,
            volatility_period: 14,
            slope_lookback: 3,
        }
    }
}

impl IndicatorConfig {
    /// Bars consumed before every indicator is defined.
    pub fn warmup_bars(&self) -> usize {
        self.volatility_period.max(self.slope_lookback)
    }
}

/// Compute EMAs, ATR and angles, and emit one [`IndicatorBar`] per input bar
/// from the first bar on which all of them are valid. Warm-up bars are
/// dropped so the output never carries undefined values.
pub fn annotate(bars: &[OhlcvBar], config: &IndicatorConfig) -> Vec<IndicatorBar> {
    let fast = calculate_ema(bars, config.fast_period);
    let slow = calculate_ema(bars, config.slow_period);
    let atr = calculate_atr(bars, config.volatility_period);
    let fast_angle = calculate_angle(&fast, &atr, config.slope_lookback);
    let slow_angle = calculate_angle(&slow, &atr, config.slope_lookback);

    let series = [&fast, &slow, &atr, &fast_angle, &slow_angle];
    if series.iter().any(|s| s.values.len() != bars.len()) {
        return Vec::new();
    }

    let annotated: Vec<IndicatorBar> = bars
        .iter()
        .enumerate()
        .filter(|&(i, _)| series.iter().all(|s| s.values[i].valid))
        .map(|(i, bar)| IndicatorBar {
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            fast_trend: fast.values[i].value,
            slow_trend: slow.values[i].value,
            volatility: atr.values[i].value,
            fast_angle: fast_angle.values[i].value,
            slow_angle: slow_angle.values[i].value,
            angle_spread: (fast_angle.values[i].value - slow_angle.values[i].value).abs(),
        })
        .collect();

    debug!(
        input = bars.len(),
        output = annotated.len(),
        fast = %fast.indicator_type,
        slow = %slow.indicator_type,
        atr = %atr.indicator_type,
        "bars annotated"
    );

    annotated
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn trending_bars(count: usize) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        (0..count)
            .map(|i| {
                let close = 100.0 + i as f64;
                OhlcvBar {
                    timestamp: start + Duration::minutes(5 * i as i64),
                    open: close - 0.5,
                    high: close + 0.5,
                    low: close - 1.0,
                    close,
                    volume: 10.0,
                }
            })
            .collect()
    }

    #[test]
    fn warmup_is_dropped() {
        let bars = trending_bars(30);
        let config = IndicatorConfig::default();
        let annotated = annotate(&bars, &config);

        assert_eq!(annotated.len(), 30 - config.warmup_bars());
        assert_eq!(annotated[0].timestamp, bars[14].timestamp);
    }

    #[test]
    fn uptrend_has_fast_above_slow_and_positive_angles() {
        let annotated = annotate(&trending_bars(40), &IndicatorConfig::default());
        let last = annotated.last().unwrap();

        assert!(last.fast_trend > last.slow_trend);
        assert!(last.fast_angle > 0.0);
        assert!(last.slow_angle > 0.0);
        assert!(last.fast_angle > last.slow_angle);
        assert!((last.angle_spread - (last.fast_angle - last.slow_angle)).abs() < 1e-12);
    }

    #[test]
    fn annotated_stream_is_well_formed() {
        let annotated = annotate(&trending_bars(60), &IndicatorConfig::default());
        assert!(crate::domain::bar::validate_stream(&annotated).is_ok());
    }

    #[test]
    fn too_few_bars_yield_nothing() {
        let annotated = annotate(&trending_bars(10), &IndicatorConfig::default());
        assert!(annotated.is_empty());
    }

    #[test]
    fn lookback_longer_than_atr_sets_warmup() {
        let config = IndicatorConfig {
            volatility_period: 2,
            slope_lookback: 5,
            ..IndicatorConfig::default()
        };
        assert_eq!(config.warmup_bars(), 5);
        let annotated = annotate(&trending_bars(12), &config);
        assert_eq!(annotated.len(), 7);
    }
}
