//! # Availability Evaluator
//!
//! Computes the *sellable* quantity for a product:
//!
//! ```text
//! sellable = on_hand − Σ quantity of unexpired holds
//! ```
//!
//! Expired-but-not-yet-swept holds are treated as already vacated -
//! expiry is a pure function of the stored timestamp, evaluated against
//! the clock at read time.
//!
//! The evaluation is a pure read with no side effects. When it gates a
//! reservation insert it MUST run on the same transaction as the insert
//! ([`sellable_on`] takes the connection for exactly that reason); the
//! pool-level [`AvailabilityEvaluator::sellable`] is for standalone
//! storefront reads.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{EngineError, EngineResult};
use stockguard_core::{CoreError, SellableStock};

/// Pool-level availability reads for storefront and admin callers.
#[derive(Debug, Clone)]
pub struct AvailabilityEvaluator {
    pool: SqlitePool,
}

impl AvailabilityEvaluator {
    /// Creates a new AvailabilityEvaluator.
    pub fn new(pool: SqlitePool) -> Self {
        AvailabilityEvaluator { pool }
    }

    /// Availability snapshot for one product at the current instant.
    ///
    /// Counts every active hold, including the asking shopper's own - the
    /// storefront wants "what could a fresh session buy". The reserve
    /// path uses the session-excluding variant instead.
    ///
    /// ## Returns
    /// * `Ok(SellableStock)` - snapshot
    /// * `Err(Core(ProductNotFound))` - unknown product
    pub async fn sellable(&self, product_id: &str) -> EngineResult<SellableStock> {
        let mut conn = self.pool.acquire().await.map_err(EngineError::from)?;
        sellable_on(&mut conn, product_id, None, Utc::now()).await
    }
}

/// Availability on a specific connection - the in-transaction building
/// block shared by the evaluator, the reservation manager, and commit.
///
/// `exclude_session` removes one session's own holds from the reserved
/// sum, letting a shopper re-check (and re-reserve) without their prior
/// hold counting against them.
pub(crate) async fn sellable_on(
    conn: &mut SqliteConnection,
    product_id: &str,
    exclude_session: Option<&str>,
    now: DateTime<Utc>,
) -> EngineResult<SellableStock> {
    let on_hand: Option<i64> = sqlx::query_scalar("SELECT on_hand FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    let on_hand = on_hand.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

    let reserved: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT SUM(quantity)
        FROM stock_reservations
        WHERE product_id = ?1
          AND expires_at > ?2
          AND (?3 IS NULL OR session_id <> ?3)
        "#,
    )
    .bind(product_id)
    .bind(now)
    .bind(exclude_session)
    .fetch_one(&mut *conn)
    .await?;

    let reserved = reserved.unwrap_or(0);

    Ok(SellableStock {
        product_id: product_id.to_string(),
        on_hand,
        // Reported sellable never goes below zero even if holds briefly
        // overlap a manual stock decrease.
        sellable: (on_hand - reserved).max(0),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use crate::repository::reservation::ReservationRepository;
    use chrono::{Duration, Utc};
    use stockguard_core::MovementKind;

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.availability().sellable("ghost").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Core(stockguard_core::CoreError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_active_holds_suppress_sellable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().register("SKU-1", "Widget").await.unwrap();
        db.mutator()
            .apply_delta(&product.id, 10, MovementKind::Restock, "receiving", None, None)
            .await
            .unwrap();

        let now = Utc::now();
        let hold = ReservationRepository::build(
            &product.id,
            4,
            "sess-a",
            now,
            now + Duration::seconds(60),
        );
        db.reservations().insert(&hold).await.unwrap();

        let snapshot = db.availability().sellable(&product.id).await.unwrap();
        assert_eq!(snapshot.on_hand, 10);
        assert_eq!(snapshot.sellable, 6);
    }

    #[tokio::test]
    async fn test_expired_holds_are_already_vacated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().register("SKU-1", "Widget").await.unwrap();
        db.mutator()
            .apply_delta(&product.id, 3, MovementKind::Restock, "receiving", None, None)
            .await
            .unwrap();

        let now = Utc::now();
        let lapsed = ReservationRepository::build(
            &product.id,
            3,
            "sess-a",
            now - Duration::seconds(120),
            now - Duration::seconds(1),
        );
        db.reservations().insert(&lapsed).await.unwrap();

        // No sweep has run, but the lapsed hold no longer suppresses stock.
        let snapshot = db.availability().sellable(&product.id).await.unwrap();
        assert_eq!(snapshot.sellable, 3);
    }

    #[tokio::test]
    async fn test_sellable_floors_at_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().register("SKU-1", "Widget").await.unwrap();
        db.mutator()
            .apply_delta(&product.id, 2, MovementKind::Restock, "receiving", None, None)
            .await
            .unwrap();

        let now = Utc::now();
        let hold = ReservationRepository::build(
            &product.id,
            2,
            "sess-a",
            now,
            now + Duration::seconds(60),
        );
        db.reservations().insert(&hold).await.unwrap();

        // Manual recount shrinks on_hand below the held quantity.
        db.mutator()
            .apply_delta(
                &product.id,
                -1,
                MovementKind::ManualAdjustment,
                "shrinkage",
                None,
                None,
            )
            .await
            .unwrap();

        let snapshot = db.availability().sellable(&product.id).await.unwrap();
        assert_eq!(snapshot.on_hand, 1);
        assert_eq!(snapshot.sellable, 0);
    }
}
