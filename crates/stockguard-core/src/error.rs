//! # Error Types
//!
//! Domain-specific error types for stockguard-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockguard-core errors (this file)                                    │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockguard-db errors (separate crate)                                 │
//! │  ├── DbError          - Storage failures, busy/locked classification   │
//! │  └── EngineError      - Core | Db union returned by engine operations  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, quantities)
//! 3. Errors are enum variants, never String
//! 4. `InsufficientStock` and `ReservationExpired` are *expected* checkout
//!    outcomes, not system failures - callers re-check availability

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. They should be caught
/// and translated to user-friendly messages by the checkout UI.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Session owns no reservations.
    ///
    /// ## When This Occurs
    /// - Committing a session that never reserved
    /// - Committing a session whose holds were already swept
    #[error("Session has no reservations: {0}")]
    SessionNotFound(String),

    /// Requested quantity exceeds the sellable quantity.
    ///
    /// ## When This Occurs
    /// - Another shopper's hold suppresses the remaining units
    /// - Stock genuinely ran out
    ///
    /// ## Caller Workflow
    /// ```text
    /// reserve(session, [{P1, qty: 2}])
    ///      │
    ///      ▼
    /// sellable(P1) = 1
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: "P1", available: 1, requested: 2 }
    ///      │
    ///      ▼
    /// UI shows: "Only 1 left in stock"
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// A hold lapsed before the session committed.
    ///
    /// The whole commit is rejected; the caller re-reserves and retries.
    #[error("Reservation expired for {product_id}")]
    ReservationExpired { product_id: String },

    /// A stock delta would drive the on-hand count negative.
    #[error("Invalid adjustment for {product_id}: on hand {on_hand}, delta {delta}")]
    InvalidAdjustment {
        product_id: String,
        on_hand: i64,
        delta: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Raised before any store access.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be zero.
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Too many entries in a collection.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Duplicate value in a batch (e.g., same product twice).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
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
        let err = CoreError::InsufficientStock {
            product_id: "P1".to_string(),
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for P1: available 1, requested 2"
        );

        let err = CoreError::ReservationExpired {
            product_id: "P1".to_string(),
        };
        assert_eq!(err.to_string(), "Reservation expired for P1");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "session_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
