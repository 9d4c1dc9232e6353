use std::fmt;

use crate::domain::amount::AMOUNT_INPUT_MAX_LEN;

pub const REFERENCE_NO_MAX_LEN: usize = 64;
pub const MERCHANT_ID_MAX_LEN: usize = 64;
pub const CURRENCY_MAX_LEN: usize = 8;
pub const STATUS_DESC_MAX_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

/// Required, bounded, and free of control characters.
pub fn validate_identifier(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    validate_required(field, value)?;
    validate_max_len(field, value, max_len)?;

    if value.chars().any(|ch| ch.is_control()) {
        return Err(ValidationError::new(
            field,
            "must not contain control characters",
        ));
    }

    Ok(())
}

/// Shape checks only; whether the value is a number is the amount codec's call.
pub fn validate_amount(value: &str, currency: &str) -> ValidationResult {
    validate_required("amount.value", value)?;
    validate_max_len("amount.value", value, AMOUNT_INPUT_MAX_LEN)?;
    validate_identifier("amount.currency", currency, CURRENCY_MAX_LEN)
}
