//! Configuration validation.
//!
//! Validates every recognised field before data is loaded. Numeric keys
//! that are present but unparsable are reported as invalid rather than
//! silently replaced by their default.

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::error::TrendangleError;
use crate::domain::strategy::SameBarPolicy;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TrendangleError> {
    validate_data(config)?;
    validate_session(config)?;
    validate_resample(config)?;
    validate_indicators(config)?;
    validate_strategy(config)?;
    validate_backtest(config)?;
    Ok(())
}

pub(crate) fn parsed_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TrendangleError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(default);
    };
    let value = raw.trim().parse::<f64>().map_err(|_| {
        TrendangleError::invalid(section, key, format!("'{}' is not a number", raw.trim()))
    })?;
    if !value.is_finite() {
        return Err(TrendangleError::invalid(section, key, "must be a finite number"));
    }
    Ok(value)
}

pub(crate) fn parsed_int(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<i64, TrendangleError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
            TrendangleError::invalid(section, key, format!("'{}' is not an integer", raw.trim()))
        }),
    }
}

pub(crate) fn positive_int(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<i64, TrendangleError> {
    let value = parsed_int(config, section, key, default)?;
    if value < 1 {
        return Err(TrendangleError::invalid(section, key, format!("{key} must be at least 1")));
    }
    Ok(value)
}

pub(crate) fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, TrendangleError> {
    match config.get_string("data", key) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                TrendangleError::invalid("data", key, format!("invalid {key} format, expected YYYY-MM-DD"))
            }),
    }
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), TrendangleError> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(TrendangleError::invalid(
                "data",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}

fn validate_session(config: &dyn ConfigPort) -> Result<(), TrendangleError> {
    let start = parsed_int(config, "session", "start_hour", 7)?;
    let end = parsed_int(config, "session", "end_hour", 20)?;
    for (key, hour) in [("start_hour", start), ("end_hour", end)] {
        if !(0..=23).contains(&hour) {
            return Err(TrendangleError::invalid("session", key, format!("{key} must be between 0 and 23")));
        }
    }
    if start > end {
        return Err(TrendangleError::invalid(
            "session",
            "start_hour",
            "start_hour must not be after end_hour",
        ));
    }
    Ok(())
}

fn validate_resample(config: &dyn ConfigPort) -> Result<(), TrendangleError> {
    let minutes = positive_int(config, "resample", "minutes", 5)?;
    if minutes > 1440 {
        return Err(TrendangleError::invalid(
            "resample",
            "minutes",
            "minutes must not exceed one day (1440)",
        ));
    }
    Ok(())
}

fn validate_indicators(config: &dyn ConfigPort) -> Result<(), TrendangleError> {
    let fast = positive_int(config, "indicators", "fast_period", 9)?;
    let slow = positive_int(config, "indicators", "slow_period", 20)?;
    positive_int(config, "indicators", "volatility_period", 14)?;
    positive_int(config, "indicators", "slope_lookback", 3)?;
    if slow <= fast {
        warn!(fast, slow, "slow_period is not longer than fast_period");
    }
    Ok(())
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<(), TrendangleError> {
    let threshold = parsed_double(config, "strategy", "angle_threshold", 30.0)?;
    if threshold <= 0.0 || threshold >= 90.0 {
        return Err(TrendangleError::invalid(
            "strategy",
            "angle_threshold",
            "angle_threshold must be between 0 and 90 degrees (exclusive)",
        ));
    }

    let rr = parsed_double(config, "strategy", "reward_risk_ratio", 2.0)?;
    if rr <= 0.0 {
        return Err(TrendangleError::invalid(
            "strategy",
            "reward_risk_ratio",
            "reward_risk_ratio must be positive",
        ));
    }

    let fraction = parsed_double(config, "strategy", "risk_fraction", 0.01)?;
    if fraction <= 0.0 || fraction > 1.0 {
        return Err(TrendangleError::invalid(
            "strategy",
            "risk_fraction",
            "risk_fraction must be in (0, 1]",
        ));
    }

    if let Some(policy) = config.get_string("strategy", "same_bar_policy") {
        policy
            .parse::<SameBarPolicy>()
            .map_err(|reason| TrendangleError::invalid("strategy", "same_bar_policy", reason))?;
    }
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), TrendangleError> {
    let balance = parsed_double(config, "backtest", "initial_balance", 10_000.0)?;
    if balance <= 0.0 {
        return Err(TrendangleError::invalid(
            "backtest",
            "initial_balance",
            "initial_balance must be positive",
        ));
    }
    Ok(())
}
