//! Cost entry and money rules.

use crate::error::CoreError;
use crate::types::Money;

/// Whole currency units a stored amount must stay below (`NUMERIC(15,2)`).
pub const MAX_MONEY_UNITS: i64 = 10_000_000_000_000;

/// Reject amounts whose magnitude cannot be stored.
pub fn validate_money(label: &str, amount: Money) -> Result<(), CoreError> {
    if amount.abs() >= Money::from(MAX_MONEY_UNITS) {
        return Err(CoreError::Validation(format!(
            "{label} {amount} is out of range; the magnitude must be below {MAX_MONEY_UNITS}"
        )));
    }
    Ok(())
}

/// Cost amounts may be negative (credits) but never zero.
pub fn validate_cost_amount(amount: Money) -> Result<(), CoreError> {
    if amount.is_zero() {
        return Err(CoreError::Validation("Amount must not be zero".to_string()));
    }
    validate_money("Amount", amount)
}
