//! # Error Types
//!
//! Domain-specific error types for stockbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! stockbook-core errors (this file)
//! ├── CoreError        - Allocation and domain failures
//! └── ValidationError  - Input validation failures
//!
//! stockbook-db errors (separate crate)
//! └── DbError          - Database operation failures
//!
//! Flow: ValidationError → CoreError → ServiceError → Frontend
//! ```
//!
//! `InsufficientStock` and `Validation` are the two recoverable outcomes a
//! caller is expected to handle; `InvalidDeduction` signals a bug in the
//! allocation computation and is never produced by well-formed plans.

use thiserror::Error;

use crate::types::LotKey;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Stock lot cannot be found.
    #[error("Stock lot not found: {0}")]
    LotNotFound(String),

    /// Requested quantity exceeds the remaining stock across every lot
    /// matching the classification key. Construction of the whole bill
    /// aborts; nothing is allocated.
    #[error("Insufficient stock for {key}: available {available}, requested {requested}")]
    InsufficientStock {
        key: LotKey,
        available: i64,
        requested: i64,
    },

    /// Attempt to deduct more than a lot's remaining quantity, or a
    /// negative amount. Indicates a bug in the allocation computation,
    /// not a user-facing condition.
    #[error("Invalid deduction of {requested} from lot {lot_id} (remaining {remaining})")]
    InvalidDeduction {
        lot_id: String,
        remaining: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// The missing quantity for an `InsufficientStock` error, `None` for
    /// every other variant.
    pub fn shortfall(&self) -> Option<i64> {
        match self {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => Some(requested - available),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a request doesn't meet requirements. Used for early
/// validation before any allocation or storage work runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., an unparseable date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates a `Required` error.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn widget_key() -> LotKey {
        LotKey {
            product: "Widget".to_string(),
            kind: "Std".to_string(),
            place: "WarehouseX".to_string(),
            unit: "pcs".to_string(),
        }
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            key: widget_key(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Widget (Std) at WarehouseX [pcs]: available 3, requested 5"
        );
    }

    #[test]
    fn test_shortfall() {
        let err = CoreError::InsufficientStock {
            key: widget_key(),
            available: 3,
            requested: 5,
        };
        assert_eq!(err.shortfall(), Some(2));

        let err = CoreError::LotNotFound("abc".to_string());
        assert_eq!(err.shortfall(), None);
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("billNumber");
        assert_eq!(err.to_string(), "billNumber is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::required("product");
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
