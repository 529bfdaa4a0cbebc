//! # Stock Mutator
//!
//! Applies validated stock deltas: restocks, manual recounts, and order
//! reversals. The stock write and its ledger entry land in ONE
//! transaction - either both persist or neither does.
//!
//! ## Negative-Result Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  kind               delta would go below zero?                         │
//! │  ─────────────────  ──────────────────────────────────────────────     │
//! │  manual_adjustment  CLAMP to zero; ledger records the actual delta     │
//! │  everything else    REJECT with InvalidAdjustment, nothing written     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales never come through here - they are committed by the reservation
//! manager so the hold and the movement settle together.

use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, EngineResult};
use crate::manager::DEFAULT_MAX_RETRIES;
use crate::repository::movement::{append_on, MovementRepository};
use crate::repository::product::ProductRepository;
use crate::watch::LowStockWatch;
use stockguard_core::validation::{validate_delta, validate_product_id, validate_reason};
use stockguard_core::{ledger, CoreError, LedgerCheck, MovementKind, StockMovement};

const RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Applies committed, validated stock deltas and audits the ledger.
#[derive(Debug, Clone)]
pub struct StockMutator {
    pool: SqlitePool,
    watch: Option<LowStockWatch>,
    max_retries: u32,
}

impl StockMutator {
    /// Creates a new StockMutator.
    pub fn new(pool: SqlitePool, watch: Option<LowStockWatch>) -> Self {
        StockMutator {
            pool,
            watch,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Overrides the transaction retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Applies a signed delta to a product's on-hand count and appends
    /// the matching ledger movement in the same transaction.
    ///
    /// ## Arguments
    /// * `delta` - non-zero signed change
    /// * `kind` - movement kind; decides the negative-result policy
    /// * `reason` - free-text audit note (e.g. "manual stock update")
    /// * `order_id` / `actor_id` - optional references for the ledger
    ///
    /// ## Returns
    /// The appended movement; `delta` on it is the *applied* delta, which
    /// differs from the requested one only when a manual decrease clamped.
    pub async fn apply_delta(
        &self,
        product_id: &str,
        delta: i64,
        kind: MovementKind,
        reason: &str,
        order_id: Option<&str>,
        actor_id: Option<&str>,
    ) -> EngineResult<StockMovement> {
        validate_product_id(product_id)?;
        validate_delta(delta)?;
        validate_reason(reason)?;

        let mut attempt = 0;
        loop {
            match self
                .try_apply(product_id, delta, kind, reason, order_id, actor_id)
                .await
            {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(product_id, attempt, "Adjustment hit store contention, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                other => return other,
            }
        }
    }

    async fn try_apply(
        &self,
        product_id: &str,
        delta: i64,
        kind: MovementKind,
        reason: &str,
        order_id: Option<&str>,
        actor_id: Option<&str>,
    ) -> EngineResult<StockMovement> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let before: Option<i64> = sqlx::query_scalar("SELECT on_hand FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;
        let before = before.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let applied = if before + delta < 0 {
            if kind == MovementKind::ManualAdjustment {
                // Recounts bottom out at an empty shelf.
                -before
            } else {
                return Err(CoreError::InvalidAdjustment {
                    product_id: product_id.to_string(),
                    on_hand: before,
                    delta,
                }
                .into());
            }
        } else {
            delta
        };
        let after = before + applied;

        // Guarded write: if the row moved since our snapshot read, the
        // affected count is zero and the transaction re-runs with fresh
        // reads instead of committing a stale projection.
        let affected = sqlx::query(
            r#"
            UPDATE products
            SET on_hand = ?3, updated_at = ?4
            WHERE id = ?1 AND on_hand = ?2
            "#,
        )
        .bind(product_id)
        .bind(before)
        .bind(after)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(DbError::Busy.into());
        }

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            delta: applied,
            kind,
            reason: reason.to_string(),
            order_id: order_id.map(str::to_string),
            actor_id: actor_id.map(str::to_string),
            on_hand_before: before,
            on_hand_after: after,
            created_at: now,
        };
        append_on(&mut tx, &movement).await?;

        tx.commit().await?;

        info!(
            product_id,
            kind = %kind,
            delta = applied,
            on_hand = after,
            "Stock adjusted"
        );

        if applied < 0 {
            if let Some(watch) = &self.watch {
                watch.notify(product_id, after);
            }
        }

        Ok(movement)
    }

    /// Audits a product: replays its full ledger and compares against the
    /// cached on-hand count.
    ///
    /// A `consistent: false` result means a stock write escaped the
    /// ledger (or vice versa) and the product needs a manual recount.
    pub async fn verify_ledger(&self, product_id: &str) -> EngineResult<LedgerCheck> {
        let product = ProductRepository::new(self.pool.clone())
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let movements = MovementRepository::new(self.pool.clone())
            .replay_order(product_id)
            .await?;

        let replayed = ledger::replay(&movements);
        let consistent =
            ledger::chain_is_consistent(&movements) && replayed == product.on_hand;

        Ok(LedgerCheck {
            product_id: product_id.to_string(),
            on_hand: product.on_hand,
            replayed,
            movements: movements.len(),
            consistent,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
