//! Risk-based position sizing.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSize {
    /// Currency amount lost if the stop is hit.
    pub risk_amount: f64,
    /// Units implied by the stop distance. Reporting only; P/L is settled in
    /// `risk_amount` units.
    pub position_size: f64,
}

/// Size a position so that hitting the stop loses `balance * risk_fraction`.
///
/// `risk_per_unit` must be positive; invalid setups are rejected before
/// sizing.
pub fn size_position(balance: f64, risk_per_unit: f64, risk_fraction: f64) -> PositionSize {
    debug_assert!(risk_per_unit > 0.0, "risk_per_unit must be positive");
    let risk_amount = balance * risk_fraction;
    PositionSize {
        risk_amount,
        position_size: risk_amount / risk_per_unit,
    }
}
