//! Validation utilities

use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that an amount is strictly positive
pub fn validate_positive_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(LedgerError::Validation(
            "amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate an account code: non-empty, at most 50 characters, alphanumeric
/// plus dashes and underscores
pub fn validate_account_code(code: &str) -> LedgerResult<()> {
    if code.trim().is_empty() {
        return Err(LedgerError::Validation(
            "account code cannot be empty".to_string(),
        ));
    }

    if code.len() > 50 {
        return Err(LedgerError::Validation(
            "account code cannot exceed 50 characters".to_string(),
        ));
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LedgerError::Validation(
            "account code can only contain alphanumeric characters, dashes, and underscores"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate an account name: non-empty, at most 100 characters
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "account name cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(LedgerError::Validation(
            "account name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate a journal entry description: non-empty, at most 500 characters
pub fn validate_entry_description(description: &str) -> LedgerResult<()> {
    if description.trim().is_empty() {
        return Err(LedgerError::Validation(
            "entry description cannot be empty".to_string(),
        ));
    }

    if description.len() > 500 {
        return Err(LedgerError::Validation(
            "entry description cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}
