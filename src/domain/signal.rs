//! Setup detection: maps one bar to an optional trade setup.
//!
//! A setup needs trend alignment (fast EMA above/below slow), momentum in
//! that direction (fast angle beyond the threshold) and near-parallel EMAs
//! (angle spread under the threshold). Angles are ATR-normalised upstream, so
//! one threshold in degrees serves both checks.

use std::fmt;

use super::bar::IndicatorBar;
use super::strategy::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeSetup {
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_price: f64,
    pub target_price: f64,
}

impl TradeSetup {
    /// Distance from entry to stop, measured in the losing direction.
    pub fn risk_per_unit(&self) -> f64 {
        match self.direction {
            Direction::Long => self.entry_price - self.stop_price,
            Direction::Short => self.stop_price - self.entry_price,
        }
    }

    /// A setup with no room between entry and stop cannot be sized.
    pub fn is_valid(&self) -> bool {
        self.risk_per_unit() > 0.0
    }
}

pub fn detect_setup(bar: &IndicatorBar, strategy: &Strategy) -> Option<TradeSetup> {
    let threshold = strategy.angle_threshold;
    let parallel = bar.angle_spread < threshold;

    if bar.fast_trend > bar.slow_trend && bar.fast_angle > threshold && parallel {
        let entry = bar.close;
        let stop = bar.low;
        Some(TradeSetup {
            direction: Direction::Long,
            entry_price: entry,
            stop_price: stop,
            target_price: entry + (entry - stop) * strategy.reward_risk_ratio,
        })
    } else if bar.fast_trend < bar.slow_trend && bar.fast_angle < -threshold && parallel {
        let entry = bar.close;
        let stop = bar.high;
        Some(TradeSetup {
            direction: Direction::Short,
            entry_price: entry,
            stop_price: stop,
            target_price: entry - (stop - entry) * strategy.reward_risk_ratio,
        })
    } else {
        None
    }
}
