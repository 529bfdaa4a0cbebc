//! # Validation Module
//!
//! Input validation for engine operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (checkout service / admin tooling)                    │
//! │  ├── Basic format checks before invoking the engine                    │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Rejects before ANY store access                                   │
//! │  └── Quantity bounds, batch shape, TTL sanity                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (on_hand >= 0), CHECK (quantity > 0)                        │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockguard_core::types::ReserveItem;
//! use stockguard_core::validation::{validate_reserve_items, validate_ttl_secs};
//!
//! let items = vec![ReserveItem::new("p1", 2)];
//! validate_reserve_items(&items).unwrap();
//! validate_ttl_secs(900).unwrap();
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::ReserveItem;
use crate::{MAX_ITEM_QUANTITY, MAX_RESERVATION_TTL_SECS, MAX_RESERVE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a checkout-session identifier.
///
/// Sessions are opaque strings minted by the caller; the engine only
/// requires that they are non-empty and of sane length.
pub fn validate_session_id(session_id: &str) -> ValidationResult<()> {
    let session_id = session_id.trim();

    if session_id.is_empty() {
        return Err(ValidationError::Required {
            field: "session_id".to_string(),
        });
    }

    if session_id.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "session_id".to_string(),
            max: 128,
        });
    }

    Ok(())
}

/// Validates a product identifier.
pub fn validate_product_id(product_id: &str) -> ValidationResult<()> {
    if product_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "product_id".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Reservation Validators
// =============================================================================

/// Validates the item batch of a reserve request.
///
/// ## Rules
/// - Batch must be non-empty and at most [`MAX_RESERVE_ITEMS`] lines
/// - Every quantity must be 1..=[`MAX_ITEM_QUANTITY`]
/// - A product may appear at most once per batch (callers merge lines)
pub fn validate_reserve_items(items: &[ReserveItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if items.len() > MAX_RESERVE_ITEMS {
        return Err(ValidationError::TooMany {
            field: "items".to_string(),
            max: MAX_RESERVE_ITEMS,
        });
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(items.len());

    for item in items {
        validate_product_id(&item.product_id)?;

        if item.quantity < 1 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }

        if item.quantity > MAX_ITEM_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: MAX_ITEM_QUANTITY,
            });
        }

        if !seen.insert(item.product_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "product_id".to_string(),
                value: item.product_id.clone(),
            });
        }
    }

    Ok(())
}

/// Validates a caller-supplied reservation TTL in seconds.
pub fn validate_ttl_secs(ttl_secs: i64) -> ValidationResult<()> {
    if ttl_secs < 1 || ttl_secs > MAX_RESERVATION_TTL_SECS {
        return Err(ValidationError::OutOfRange {
            field: "ttl_secs".to_string(),
            min: 1,
            max: MAX_RESERVATION_TTL_SECS,
        });
    }

    Ok(())
}

// =============================================================================
// Adjustment Validators
// =============================================================================

/// Validates a manual/admin stock delta before it reaches the mutator.
///
/// A zero delta is rejected: it would append a no-op ledger entry and
/// almost always indicates a caller bug.
pub fn validate_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::MustBeNonZero {
            field: "delta".to_string(),
        });
    }

    Ok(())
}

/// Validates the free-text reason attached to a movement.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    if reason.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_rules() {
        assert!(validate_session_id("sess-abc123").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("   ").is_err());
        assert!(validate_session_id(&"x".repeat(200)).is_err());
    }

    #[test]
    fn test_empty_batch_rejected() {
        let err = validate_reserve_items(&[]).unwrap_err();
        assert!(matches!(err, ValidationError::Required { .. }));
    }

    #[test]
    fn test_zero_and_negative_quantities_rejected() {
        let items = vec![ReserveItem::new("p1", 0)];
        assert!(matches!(
            validate_reserve_items(&items),
            Err(ValidationError::MustBePositive { .. })
        ));

        let items = vec![ReserveItem::new("p1", -3)];
        assert!(validate_reserve_items(&items).is_err());
    }

    #[test]
    fn test_duplicate_product_rejected() {
        let items = vec![ReserveItem::new("p1", 1), ReserveItem::new("p1", 2)];
        assert!(matches!(
            validate_reserve_items(&items),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let items: Vec<ReserveItem> = (0..=MAX_RESERVE_ITEMS)
            .map(|i| ReserveItem::new(format!("p{i}"), 1))
            .collect();
        assert!(matches!(
            validate_reserve_items(&items),
            Err(ValidationError::TooMany { .. })
        ));
    }

    #[test]
    fn test_ttl_bounds() {
        assert!(validate_ttl_secs(1).is_ok());
        assert!(validate_ttl_secs(900).is_ok());
        assert!(validate_ttl_secs(MAX_RESERVATION_TTL_SECS).is_ok());

        assert!(validate_ttl_secs(0).is_err());
        assert!(validate_ttl_secs(-5).is_err());
        assert!(validate_ttl_secs(MAX_RESERVATION_TTL_SECS + 1).is_err());
    }

    #[test]
    fn test_delta_rules() {
        assert!(validate_delta(5).is_ok());
        assert!(validate_delta(-5).is_ok());
        assert!(matches!(
            validate_delta(0),
            Err(ValidationError::MustBeNonZero { .. })
        ));
    }
}
