//! Indicator series used to annotate bars.
//!
//! - `IndicatorPoint`: one value with its timestamp and warm-up flag
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: a time series of points, aligned 1:1 with its input bars

pub mod angle;
pub mod atr;
pub mod ema;

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    Atr(usize),
    /// ATR-normalised slope angle of an EMA.
    Angle { ema_period: usize, lookback: usize },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Index of the first valid point, if any.
    pub fn first_valid(&self) -> Option<usize> {
        self.values.iter().position(|p| p.valid)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Angle {
                ema_period,
                lookback,
            } => write!(f, "ANGLE(EMA({}),{})", ema_period, lookback),
        }
    }
}
