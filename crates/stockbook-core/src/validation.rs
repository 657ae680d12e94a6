//! # Validation Module
//!
//! Input validation for intake and bill requests.
//!
//! Validation runs before any allocation or storage work: a request that
//! fails here never reaches the lot store. The database adds its own NOT
//! NULL and foreign key constraints as a second layer.

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::{MAX_BILL_NUMBER_LEN, MAX_KEY_FIELD_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a bill number.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - Must be at most 50 characters
///
/// Bill numbers are free text assigned by the user; uniqueness is not
/// required.
pub fn validate_bill_number(bill_number: &str) -> ValidationResult<()> {
    let bill_number = bill_number.trim();

    if bill_number.is_empty() {
        return Err(ValidationError::required("billNumber"));
    }

    if bill_number.len() > MAX_BILL_NUMBER_LEN {
        return Err(ValidationError::TooLong {
            field: "billNumber".to_string(),
            max: MAX_BILL_NUMBER_LEN,
        });
    }

    Ok(())
}

/// Validates one classification key field (product, type, place, unit).
pub fn validate_key_field(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.len() > MAX_KEY_FIELD_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_KEY_FIELD_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value (intake sizes and requested line quantities).
///
/// Must be positive; zero-quantity requests are rejected rather than
/// silently producing empty allocations.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price in cents. Zero is allowed (free stock).
pub fn validate_amount_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Date Parsing
// =============================================================================

/// Parses a calendar date in `YYYY-MM-DD` form.
///
/// The IPC boundary receives dates as strings (the frontend date picker
/// emits ISO dates); this is the single place they are turned into typed
/// dates.
pub fn parse_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: e.to_string(),
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bill_number() {
        assert!(validate_bill_number("INV-2081-004").is_ok());
        assert!(validate_bill_number("4").is_ok());

        assert!(validate_bill_number("").is_err());
        assert!(validate_bill_number("   ").is_err());
        assert!(validate_bill_number(&"9".repeat(60)).is_err());
    }

    #[test]
    fn test_validate_key_field() {
        assert!(validate_key_field("product", "Widget").is_ok());
        assert!(validate_key_field("place", "").is_err());
        assert!(validate_key_field("unit", &"m".repeat(200)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10_000).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-4).is_err());
    }

    #[test]
    fn test_validate_amount_cents() {
        assert!(validate_amount_cents(0).is_ok());
        assert!(validate_amount_cents(500).is_ok());
        assert!(validate_amount_cents(-1).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("billDate", "2081-02-01").unwrap(),
            NaiveDate::from_ymd_opt(2081, 2, 1).unwrap()
        );
        assert!(parse_date("billDate", "01/02/2081").is_err());
        assert!(parse_date("billDate", "").is_err());
    }
}
