//! EMA angle strategy parameters and the same-bar tie-break policy.

use std::fmt;
use std::str::FromStr;

/// Which exit wins when a single bar touches both the stop and the target.
///
/// Bars carry no intrabar path, so this is a fixed assumption rather than a
/// simulation of fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameBarPolicy {
    /// Adversarial: assume the stop filled first.
    StopFirst,
    /// Optimistic: assume the target filled first.
    TargetFirst,
}

pub const DEFAULT_SAME_BAR_POLICY: SameBarPolicy = SameBarPolicy::StopFirst;

impl Default for SameBarPolicy {
    fn default() -> Self {
        DEFAULT_SAME_BAR_POLICY
    }
}

impl fmt::Display for SameBarPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameBarPolicy::StopFirst => write!(f, "stop_first"),
            SameBarPolicy::TargetFirst => write!(f, "target_first"),
        }
    }
}

impl FromStr for SameBarPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stop_first" | "stop" => Ok(SameBarPolicy::StopFirst),
            "target_first" | "target" => Ok(SameBarPolicy::TargetFirst),
            other => Err(format!(
                "unknown same-bar policy '{other}' (expected stop_first or target_first)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    /// Degrees. Minimum fast-EMA steepness and maximum fast/slow spread.
    pub angle_threshold: f64,
    pub reward_risk_ratio: f64,
    /// Fraction of the current balance risked per trade.
    pub risk_fraction: f64,
    pub same_bar_policy: SameBarPolicy,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy {
            name: "EMA Angle".to_string(),
            angle_threshold: 30.0,
            reward_risk_ratio: 2.0,
            risk_fraction: 0.01,
            same_bar_policy: DEFAULT_SAME_BAR_POLICY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_strategy_fields() {
        let s = Strategy::default();
        assert_eq!(s.name, "EMA Angle");
        assert!((s.angle_threshold - 30.0).abs() < f64::EPSILON);
        assert!((s.reward_risk_ratio - 2.0).abs() < f64::EPSILON);
        assert!((s.risk_fraction - 0.01).abs() < f64::EPSILON);
        assert_eq!(s.same_bar_policy, SameBarPolicy::StopFirst);
    }

    #[test]
    fn policy_parses_both_spellings() {
        assert_eq!("stop_first".parse::<SameBarPolicy>(), Ok(SameBarPolicy::StopFirst));
        assert_eq!(" Target_First ".parse::<SameBarPolicy>(), Ok(SameBarPolicy::TargetFirst));
        assert_eq!("target".parse::<SameBarPolicy>(), Ok(SameBarPolicy::TargetFirst));
    }

    #[test]
    fn policy_rejects_unknown() {
        assert!("coin_flip".parse::<SameBarPolicy>().is_err());
    }

    #[test]
    fn policy_display_round_trips() {
        for policy in [SameBarPolicy::StopFirst, SameBarPolicy::TargetFirst] {
            assert_eq!(policy.to_string().parse::<SameBarPolicy>(), Ok(policy));
        }
    }
}
