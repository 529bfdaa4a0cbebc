//! # Ledger Replay
//!
//! Pure math for auditing the stock ledger.
//!
//! ## The Audit Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  products.on_hand is a CACHED PROJECTION of the movement ledger.       │
//! │                                                                         │
//! │  movement 1:  before=0   delta=+10  after=10   (restock)               │
//! │  movement 2:  before=10  delta=-2   after=8    (sale)                  │
//! │  movement 3:  before=8   delta=-8   after=0    (manual, clamped)       │
//! │                                                                         │
//! │  replay: 0 + 10 - 2 - 8 = 0  ═══  products.on_hand                    │
//! │                                                                         │
//! │  Any mismatch means a stock write escaped the ledger (or vice versa)   │
//! │  and the product needs a manual recount.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The database layer feeds movements in commit order (oldest first); this
//! module stays pure so the invariant is testable without a database.

use crate::types::StockMovement;

/// Replays a product's movements, oldest first, and returns the on-hand
/// count the ledger implies.
///
/// An empty ledger implies zero stock: products enter the engine with
/// `on_hand = 0` and receive their opening stock through a restock
/// movement.
pub fn replay(movements: &[StockMovement]) -> i64 {
    match movements.first() {
        None => 0,
        Some(first) => first.on_hand_before + movements.iter().map(|m| m.delta).sum::<i64>(),
    }
}

/// Verifies the before/after chain links cleanly.
///
/// Checks, for movements in commit order:
/// - `after == before + delta` within each movement
/// - each movement's `before` equals the previous movement's `after`
/// - no movement leaves a negative on-hand count
pub fn chain_is_consistent(movements: &[StockMovement]) -> bool {
    let mut prev_after: Option<i64> = None;

    for m in movements {
        if m.on_hand_after != m.on_hand_before + m.delta {
            return false;
        }
        if m.on_hand_after < 0 || m.on_hand_before < 0 {
            return false;
        }
        if let Some(prev) = prev_after {
            if m.on_hand_before != prev {
                return false;
            }
        }
        prev_after = Some(m.on_hand_after);
    }

    true
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MovementKind;
    use chrono::Utc;
    use proptest::prelude::*;

    fn movement(before: i64, delta: i64) -> StockMovement {
        StockMovement {
            id: "m".to_string(),
            product_id: "p1".to_string(),
            delta,
            kind: if delta >= 0 {
                MovementKind::Restock
            } else {
                MovementKind::Sale
            },
            reason: String::new(),
            order_id: None,
            actor_id: None,
            on_hand_before: before,
            on_hand_after: before + delta,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_ledger_replays_to_zero() {
        assert_eq!(replay(&[]), 0);
        assert!(chain_is_consistent(&[]));
    }

    #[test]
    fn test_replay_reproduces_final_count() {
        let ms = vec![movement(0, 10), movement(10, -2), movement(8, -8)];
        assert_eq!(replay(&ms), 0);
        assert!(chain_is_consistent(&ms));
    }

    #[test]
    fn test_broken_chain_detected() {
        // Second movement's before doesn't match first's after.
        let ms = vec![movement(0, 10), movement(9, -2)];
        assert!(!chain_is_consistent(&ms));
    }

    #[test]
    fn test_internal_mismatch_detected() {
        let mut m = movement(5, -2);
        m.on_hand_after = 4; // tampered
        assert!(!chain_is_consistent(&[m]));
    }

    #[test]
    fn test_negative_count_detected() {
        let ms = vec![movement(1, -3)];
        assert!(!chain_is_consistent(&ms));
    }

    proptest! {
        /// Building a chain from arbitrary deltas (clamped at zero the way
        /// the mutator clamps manual decreases) always satisfies both
        /// replay and chain checks.
        #[test]
        fn prop_clamped_chain_replays(deltas in prop::collection::vec(-1000i64..1000, 0..64)) {
            let mut on_hand = 0i64;
            let mut chain = Vec::with_capacity(deltas.len());

            for d in deltas {
                let applied = if on_hand + d < 0 { -on_hand } else { d };
                chain.push(movement(on_hand, applied));
                on_hand += applied;
            }

            prop_assert_eq!(replay(&chain), on_hand);
            prop_assert!(chain_is_consistent(&chain));
        }
    }
}
