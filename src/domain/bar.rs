//! Indicator-annotated bar and the stream contract checked before simulation.

use chrono::NaiveDateTime;

use super::error::TrendangleError;

/// Relative tolerance for the stored angle spread.
const SPREAD_TOLERANCE: f64 = 1e-9;

/// One price bar with its trend indicators. Produced once by the annotation
/// pipeline (or loaded precomputed) and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Fast EMA of close.
    pub fast_trend: f64,
    /// Slow EMA of close.
    pub slow_trend: f64,
    /// ATR.
    pub volatility: f64,
    /// Degrees.
    pub fast_angle: f64,
    /// Degrees.
    pub slow_angle: f64,
    /// |fast_angle - slow_angle|
    pub angle_spread: f64,
}

impl IndicatorBar {
    fn numeric_fields(&self) -> [(&'static str, f64); 11] {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
            ("fast_trend", self.fast_trend),
            ("slow_trend", self.slow_trend),
            ("volatility", self.volatility),
            ("fast_angle", self.fast_angle),
            ("slow_angle", self.slow_angle),
            ("angle_spread", self.angle_spread),
        ]
    }

    /// Check the per-bar invariants. Returns a description of the first
    /// violation found.
    pub fn check(&self) -> Result<(), String> {
        for (name, value) in self.numeric_fields() {
            if !value.is_finite() {
                return Err(format!("{name} is not finite ({value})"));
            }
        }
        if self.high < self.low {
            return Err(format!("high {} below low {}", self.high, self.low));
        }
        if self.high < self.open.max(self.close) {
            return Err(format!(
                "high {} below open/close {}",
                self.high,
                self.open.max(self.close)
            ));
        }
        if self.low > self.open.min(self.close) {
            return Err(format!(
                "low {} above open/close {}",
                self.low,
                self.open.min(self.close)
            ));
        }
        if self.volatility < 0.0 {
            return Err(format!("volatility {} is negative", self.volatility));
        }
        for (name, angle) in [("fast_angle", self.fast_angle), ("slow_angle", self.slow_angle)] {
            if angle <= -90.0 || angle >= 90.0 {
                return Err(format!("{name} {angle} outside (-90, 90)"));
            }
        }
        if self.angle_spread < 0.0 {
            return Err(format!("angle_spread {} is negative", self.angle_spread));
        }
        let expected = (self.fast_angle - self.slow_angle).abs();
        if (self.angle_spread - expected).abs() > SPREAD_TOLERANCE * expected.max(1.0) {
            return Err(format!(
                "angle_spread {} does not match |fast_angle - slow_angle| = {expected}",
                self.angle_spread
            ));
        }
        Ok(())
    }
}

/// Validate the whole stream: every bar satisfies [`IndicatorBar::check`] and
/// timestamps are strictly increasing. The stream is never repaired here.
pub fn validate_stream(bars: &[IndicatorBar]) -> Result<(), TrendangleError> {
    for (index, bar) in bars.iter().enumerate() {
        bar.check()
            .map_err(|reason| TrendangleError::malformed(index, reason))?;
        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(TrendangleError::malformed(
                index,
                format!(
                    "timestamp {} not after previous {}",
                    bar.timestamp,
                    bars[index - 1].timestamp
                ),
            ));
        }
    }
    Ok(())
}
