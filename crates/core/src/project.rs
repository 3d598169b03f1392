//! Project-level field rules.

use crate::error::CoreError;
use crate::schedule::validate_date_range;
use crate::types::{Date, Money};
use crate::wbs::validate_budget;

/// Currency used when a project does not name one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Currencies are three uppercase ASCII letters (ISO 4217 style).
pub fn validate_currency(currency: &str) -> Result<(), CoreError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid currency '{currency}': expected a three-letter code such as USD"
        )))
    }
}

/// Validate the fields shared by project create and update.
pub fn validate_project_fields(
    start: Option<Date>,
    end: Option<Date>,
    budget: Option<Money>,
    currency: Option<&str>,
) -> Result<(), CoreError> {
    validate_date_range(start, end)?;
    if let Some(budget) = budget {
        validate_budget(budget)?;
    }
    if let Some(currency) = currency {
        validate_currency(currency)?;
    }
    Ok(())
}
