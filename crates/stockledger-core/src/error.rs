//! # Error Types
//!
//! Domain-specific error types for stockledger-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockledger-core errors (this file)                                   │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── RenderError      - QR/PDF generation failures                     │
//! │                                                                         │
//! │  stockledger-db errors (separate crate)                                │
//! │  └── DbError          - Database failures, wraps the above             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Outbound or loaned quantity exceeds what the item currently holds.
    ///
    /// ## User Workflow
    /// ```text
    /// Record movement (outbound, qty: 11)
    ///      │
    ///      ▼
    /// Recompute balance: available=10
    ///      │
    ///      ▼
    /// InsufficientQuantity { item_id, available: 10, requested: 11 }
    ///      │
    ///      ▼
    /// Transaction rolled back, balance unchanged
    /// ```
    #[error("Insufficient quantity for item {item_id}: available {available}, requested {requested}")]
    InsufficientQuantity {
        item_id: String,
        available: i32,
        requested: i32,
    },

    /// The aggregated balance no longer fits the persisted 32-bit column.
    #[error("Balance {value} is out of range for a stored quantity")]
    QuantityOverflow { value: i64 },

    /// Item still has ledger history and cannot be deleted.
    #[error("Item {item_id} has {movements} movement(s) and cannot be deleted")]
    ItemHasMovements { item_id: String, movements: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet the field requirements.
/// Used for early validation before any row is written.
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

    /// Numeric value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Floating point value is NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Render Error
// =============================================================================

/// QR/PDF artifact generation failures.
///
/// Any of these aborts the item create/update that triggered rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The payload could not be encoded as a QR symbol (e.g. too long).
    #[error("QR encoding failed: {0}")]
    Encode(String),

    /// The QR bitmap could not be encoded as PNG.
    #[error("Image encoding failed: {0}")]
    Image(String),

    /// The PDF document could not be produced.
    #[error("PDF generation failed: {0}")]
    Pdf(String),
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

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientQuantity {
            item_id: "drill-01".to_string(),
            available: 10,
            requested: 11,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient quantity for item drill-01: available 10, requested 11"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
