//! # Reservation Manager
//!
//! The engine's concurrency-control core: atomic reserve / release /
//! commit against a shared SQLite store.
//!
//! ## The Race This Module Exists To Close
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │             Two shoppers, one unit left on the shelf                    │
//! │                                                                         │
//! │  ❌ WRONG: check and insert as two unguarded steps                     │
//! │     Shopper A: sellable? → 1        Shopper B: sellable? → 1           │
//! │     Shopper A: insert hold(1)       Shopper B: insert hold(1)          │
//! │     → both holds exist, stock oversold at commit                       │
//! │                                                                         │
//! │  ✅ CORRECT: check and insert inside ONE transaction                   │
//! │     ┌──────────────────── txn A ────────────────────┐                  │
//! │     │ read snapshot → sellable 1 → insert hold      │ commits         │
//! │     └────────────────────────────────────────────────┘                  │
//! │     ┌──────────────────── txn B ────────────────────┐                  │
//! │     │ read snapshot → sellable 1 → insert hold      │ SQLITE_BUSY     │
//! │     └────────────────────────────────────────────────┘ (stale snapshot)│
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │     classify as DbError::Busy → retry with FRESH reads                 │
//! │     fresh sellable = 0 → InsufficientStock (exactly one winner)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Correctness is enforced by the store's isolation, not by application
//! mutexes: under WAL a transaction that read a snapshot and then loses
//! the write race cannot commit. The manager retries the whole
//! transaction - re-validating availability each time - up to a bounded
//! budget, then surfaces `Busy` so callers can back off.
//!
//! First-committed-wins; no fairness or queueing guarantee is made.
//!
//! Blocking is bounded by the pool acquire timeout, the SQLite busy
//! timeout, and the retry budget. Callers wanting a hard deadline wrap
//! calls in `tokio::time::timeout`; an elapsed timeout leaves the outcome
//! unknown - re-query state rather than assume the transaction failed.

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::availability::sellable_on;
use crate::error::EngineResult;
use crate::repository::movement::append_on;
use crate::repository::reservation::ReservationRepository;
use crate::watch::LowStockWatch;
use stockguard_core::validation::{
    validate_reserve_items, validate_session_id, validate_ttl_secs,
};
use stockguard_core::{
    CoreError, MovementKind, Reservation, ReservationReceipt, ReserveItem, StockMovement,
    ValidationError,
};

/// Transaction retry budget for contended reserve/commit calls.
pub const DEFAULT_MAX_RETRIES: u32 = 8;

/// Base backoff between retries; grows linearly with the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Atomic reserve / release / commit operations.
#[derive(Debug, Clone)]
pub struct ReservationManager {
    pool: SqlitePool,
    watch: Option<LowStockWatch>,
    max_retries: u32,
}

impl ReservationManager {
    /// Creates a new ReservationManager.
    pub fn new(pool: SqlitePool, watch: Option<LowStockWatch>) -> Self {
        ReservationManager {
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

    // =========================================================================
    // Reserve
    // =========================================================================

    /// Places a time-bounded hold on every item in the batch, or none.
    ///
    /// ## Semantics
    /// - All-or-nothing: if ANY line exceeds its sellable quantity the
    ///   whole call fails with `InsufficientStock` and no rows are written
    /// - A session re-reserving a product REPLACES its prior hold for
    ///   that product; its own holds don't count against its availability
    /// - Safe under arbitrary concurrency: two callers racing for the
    ///   last unit cannot both succeed
    ///
    /// ## Arguments
    /// * `session_id` - opaque checkout-session identifier
    /// * `items` - non-empty batch, one line per product
    /// * `ttl_secs` - hold lifetime; see `DEFAULT_RESERVATION_TTL_SECS`
    ///
    /// ## Returns
    /// The expiry instant shared by every hold in the batch.
    pub async fn reserve(
        &self,
        session_id: &str,
        items: &[ReserveItem],
        ttl_secs: i64,
    ) -> EngineResult<ReservationReceipt> {
        // Reject before any store access.
        validate_session_id(session_id)?;
        validate_reserve_items(items)?;
        validate_ttl_secs(ttl_secs)?;

        let mut attempt = 0;
        loop {
            match self.try_reserve(session_id, items, ttl_secs).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(session_id, attempt, "Reserve hit store contention, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                other => return other,
            }
        }
    }

    /// One reserve transaction: evaluate, then insert, on one snapshot.
    async fn try_reserve(
        &self,
        session_id: &str,
        items: &[ReserveItem],
        ttl_secs: i64,
    ) -> EngineResult<ReservationReceipt> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let expires_at = now + ChronoDuration::seconds(ttl_secs);

        // Evaluate every line before writing anything. A failure here
        // drops the transaction and rolls back - partial holds are
        // impossible by construction.
        for item in items {
            let snapshot =
                sellable_on(&mut tx, &item.product_id, Some(session_id), now).await?;

            if snapshot.sellable < item.quantity {
                return Err(CoreError::InsufficientStock {
                    product_id: item.product_id.clone(),
                    available: snapshot.sellable,
                    requested: item.quantity,
                }
                .into());
            }
        }

        for item in items {
            // Replace any prior hold this session has on the product.
            sqlx::query(
                "DELETE FROM stock_reservations WHERE session_id = ?1 AND product_id = ?2",
            )
            .bind(session_id)
            .bind(&item.product_id)
            .execute(&mut *tx)
            .await?;

            let row = ReservationRepository::build(
                &item.product_id,
                item.quantity,
                session_id,
                now,
                expires_at,
            );

            sqlx::query(
                r#"
                INSERT INTO stock_reservations (
                    id, product_id, quantity, session_id, created_at, expires_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&row.id)
            .bind(&row.product_id)
            .bind(row.quantity)
            .bind(&row.session_id)
            .bind(row.created_at)
            .bind(row.expires_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(session_id, lines = items.len(), %expires_at, "Stock reserved");
        Ok(ReservationReceipt { expires_at })
    }

    // =========================================================================
    // Release
    // =========================================================================

    /// Drops every hold owned by the session.
    ///
    /// Idempotent: releasing a session with no holds is a zero-count
    /// no-op, not an error.
    pub async fn release(&self, session_id: &str) -> EngineResult<u64> {
        validate_session_id(session_id)?;

        let released = ReservationRepository::new(self.pool.clone())
            .delete_for_session(session_id)
            .await?;

        Ok(released)
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Converts a session's holds into a sale: one transaction that
    /// decrements on-hand stock, appends a `sale` ledger movement per
    /// hold, and deletes the hold rows.
    ///
    /// ## Semantics
    /// - `SessionNotFound` when the session owns no holds
    /// - `ReservationExpired` if ANY hold lapsed - the whole commit is
    ///   rejected and state is left unchanged; lapsed holds stay for the
    ///   sweeper rather than being silently committed
    /// - Movements carry before/after on-hand values and the order id
    ///
    /// ## Returns
    /// The appended movements, one per committed hold.
    pub async fn commit(
        &self,
        session_id: &str,
        order_id: &str,
        actor_id: Option<&str>,
    ) -> EngineResult<Vec<StockMovement>> {
        validate_session_id(session_id)?;
        if order_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "order_id".to_string(),
            }
            .into());
        }

        let mut attempt = 0;
        loop {
            match self.try_commit(session_id, order_id, actor_id).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(session_id, attempt, "Commit hit store contention, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                other => return other,
            }
        }
    }

    async fn try_commit(
        &self,
        session_id: &str,
        order_id: &str,
        actor_id: Option<&str>,
    ) -> EngineResult<Vec<StockMovement>> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let holds: Vec<Reservation> = sqlx::query_as(
            r#"
            SELECT id, product_id, quantity, session_id, created_at, expires_at
            FROM stock_reservations
            WHERE session_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await?;

        if holds.is_empty() {
            return Err(CoreError::SessionNotFound(session_id.to_string()).into());
        }

        // Check every hold before touching stock: a single lapsed hold
        // rejects the whole commit.
        for hold in &holds {
            if hold.is_expired(now) {
                return Err(CoreError::ReservationExpired {
                    product_id: hold.product_id.clone(),
                }
                .into());
            }
        }

        let mut movements = Vec::with_capacity(holds.len());

        for hold in &holds {
            let before: Option<i64> =
                sqlx::query_scalar("SELECT on_hand FROM products WHERE id = ?1")
                    .bind(&hold.product_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let before =
                before.ok_or_else(|| CoreError::ProductNotFound(hold.product_id.clone()))?;

            // A sale must never drive stock negative. With every hold
            // admitted through reserve() this cannot fire; it guards
            // against drift from out-of-band writes.
            if before < hold.quantity {
                return Err(CoreError::InvalidAdjustment {
                    product_id: hold.product_id.clone(),
                    on_hand: before,
                    delta: -hold.quantity,
                }
                .into());
            }

            let affected = sqlx::query(
                r#"
                UPDATE products
                SET on_hand = on_hand - ?2, updated_at = ?3
                WHERE id = ?1 AND on_hand >= ?2
                "#,
            )
            .bind(&hold.product_id)
            .bind(hold.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if affected == 0 {
                return Err(CoreError::InvalidAdjustment {
                    product_id: hold.product_id.clone(),
                    on_hand: before,
                    delta: -hold.quantity,
                }
                .into());
            }

            let movement = StockMovement {
                id: Uuid::new_v4().to_string(),
                product_id: hold.product_id.clone(),
                delta: -hold.quantity,
                kind: MovementKind::Sale,
                reason: format!("order {order_id}"),
                order_id: Some(order_id.to_string()),
                actor_id: actor_id.map(str::to_string),
                on_hand_before: before,
                on_hand_after: before - hold.quantity,
                created_at: now,
            };
            append_on(&mut tx, &movement).await?;

            sqlx::query("DELETE FROM stock_reservations WHERE id = ?1")
                .bind(&hold.id)
                .execute(&mut *tx)
                .await?;

            movements.push(movement);
        }

        tx.commit().await?;

        info!(
            session_id,
            order_id,
            lines = movements.len(),
            "Checkout committed"
        );

        // Alerts go out only after the transaction is durable.
        if let Some(watch) = &self.watch {
            for movement in &movements {
                watch.notify(&movement.product_id, movement.on_hand_after);
            }
        }

        Ok(movements)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::pool::{Database, DbConfig};
    use crate::testutil::temp_database;
    use chrono::Duration as ChronoDuration;
    use stockguard_core::{MovementKind, ReserveItem};

    async fn seeded(db: &Database, sku: &str, opening: i64) -> String {
        let product = db.products().register(sku, sku).await.unwrap();
        if opening > 0 {
            db.mutator()
                .apply_delta(&product.id, opening, MovementKind::Restock, "receiving", None, None)
                .await
                .unwrap();
        }
        product.id
    }

    #[tokio::test]
    async fn test_validation_rejects_before_store_access() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let manager = db.manager();

        // Empty batch
        assert!(manager.reserve("sess-a", &[], 900).await.is_err());
        // Zero quantity
        assert!(manager
            .reserve("sess-a", &[ReserveItem::new("p1", 0)], 900)
            .await
            .is_err());
        // Bad TTL
        assert!(manager
            .reserve("sess-a", &[ReserveItem::new("p1", 1)], 0)
            .await
            .is_err());
        // Empty session
        assert!(manager
            .reserve("", &[ReserveItem::new("p1", 1)], 900)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_reserve_unknown_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .manager()
            .reserve("sess-a", &[ReserveItem::new("ghost", 1)], 900)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_checkout_scenario() {
        // P1 has 3 on hand. A holds 2, B cannot hold 2, A commits order O1.
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p1 = seeded(&db, "P1", 3).await;
        let manager = db.manager();

        manager
            .reserve("sess-a", &[ReserveItem::new(&p1, 2)], 900)
            .await
            .unwrap();
        assert_eq!(db.availability().sellable(&p1).await.unwrap().sellable, 1);

        let err = manager
            .reserve("sess-b", &[ReserveItem::new(&p1, 2)], 900)
            .await
            .unwrap_err();
        match err {
            EngineError::Core(CoreError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("expected InsufficientStock, got {other}"),
        }

        let movements = manager.commit("sess-a", "O1", None).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementKind::Sale);
        assert_eq!(movements[0].on_hand_before, 3);
        assert_eq!(movements[0].on_hand_after, 1);
        assert_eq!(movements[0].order_id.as_deref(), Some("O1"));

        let product = db.products().require(&p1).await.unwrap();
        assert_eq!(product.on_hand, 1);
        assert!(db
            .reservations()
            .for_session("sess-a")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(db.availability().sellable(&p1).await.unwrap().sellable, 1);

        let check = db.mutator().verify_ledger(&p1).await.unwrap();
        assert!(check.consistent, "ledger must replay to on_hand: {check:?}");
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let plenty = seeded(&db, "PLENTY", 10).await;
        let scarce = seeded(&db, "SCARCE", 1).await;

        let err = db
            .manager()
            .reserve(
                "sess-a",
                &[ReserveItem::new(&plenty, 2), ReserveItem::new(&scarce, 5)],
                900,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InsufficientStock { .. })
        ));

        // Failure must not partially hold stock.
        assert_eq!(db.reservations().count().await.unwrap(), 0);
        assert_eq!(
            db.availability().sellable(&plenty).await.unwrap().sellable,
            10
        );
    }

    #[tokio::test]
    async fn test_re_reserve_replaces_own_hold() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p1 = seeded(&db, "P1", 3).await;
        let manager = db.manager();

        manager
            .reserve("sess-a", &[ReserveItem::new(&p1, 2)], 900)
            .await
            .unwrap();
        // Own hold doesn't count against the same session: raising the
        // quantity to the full shelf succeeds.
        manager
            .reserve("sess-a", &[ReserveItem::new(&p1, 3)], 900)
            .await
            .unwrap();

        let holds = db.reservations().for_session("sess-a").await.unwrap();
        assert_eq!(holds.len(), 1);
        assert_eq!(holds[0].quantity, 3);
        assert_eq!(db.availability().sellable(&p1).await.unwrap().sellable, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_last_unit_race_has_single_winner() {
        const CONTENDERS: usize = 8;

        // Temp-file database: the race needs real connection interleaving,
        // which :memory:'s single connection would serialize away.
        let db = temp_database().await;
        let p1 = seeded(&db, "LAST-UNIT", 1).await;

        let mut handles = Vec::with_capacity(CONTENDERS);
        for i in 0..CONTENDERS {
            let manager = db.manager();
            let product_id = p1.clone();
            handles.push(tokio::spawn(async move {
                manager
                    .reserve(
                        &format!("sess-{i}"),
                        &[ReserveItem::new(product_id, 1)],
                        900,
                    )
                    .await
            }));
        }

        let mut wins = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(EngineError::Core(CoreError::InsufficientStock {
                    available,
                    requested,
                    ..
                })) => {
                    assert_eq!(available, 0);
                    assert_eq!(requested, 1);
                    rejected += 1;
                }
                Err(other) => panic!("unexpected outcome: {other}"),
            }
        }

        assert_eq!(wins, 1, "exactly one contender may win the last unit");
        assert_eq!(rejected, CONTENDERS - 1);
        assert_eq!(db.availability().sellable(&p1).await.unwrap().sellable, 0);
    }

    #[tokio::test]
    async fn test_commit_unknown_session() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.manager().commit("ghost", "O1", None).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_rejects_wholly_on_one_expired_hold() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let valid_p = seeded(&db, "VALID", 5).await;
        let lapsed_p = seeded(&db, "LAPSED", 5).await;
        let manager = db.manager();

        manager
            .reserve("sess-a", &[ReserveItem::new(&valid_p, 2)], 900)
            .await
            .unwrap();

        // Second hold for the same session, already lapsed.
        let now = Utc::now();
        let lapsed = ReservationRepository::build(
            &lapsed_p,
            1,
            "sess-a",
            now - ChronoDuration::seconds(120),
            now - ChronoDuration::seconds(1),
        );
        db.reservations().insert(&lapsed).await.unwrap();

        let err = manager.commit("sess-a", "O1", None).await.unwrap_err();
        match err {
            EngineError::Core(CoreError::ReservationExpired { product_id }) => {
                assert_eq!(product_id, lapsed_p);
            }
            other => panic!("expected ReservationExpired, got {other}"),
        }

        // Nothing consumed, nothing decremented - both holds are intact
        // and the lapsed one is left for the sweeper.
        assert_eq!(db.reservations().count().await.unwrap(), 2);
        assert_eq!(db.products().require(&valid_p).await.unwrap().on_hand, 5);
        assert_eq!(db.products().require(&lapsed_p).await.unwrap().on_hand, 5);
        assert_eq!(
            db.movements().count_for_product(&valid_p).await.unwrap(),
            1 // the opening restock only
        );
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p1 = seeded(&db, "P1", 3).await;
        let manager = db.manager();

        manager
            .reserve("sess-a", &[ReserveItem::new(&p1, 2)], 900)
            .await
            .unwrap();

        assert_eq!(manager.release("sess-a").await.unwrap(), 1);
        assert_eq!(manager.release("sess-a").await.unwrap(), 0);
        assert_eq!(db.availability().sellable(&p1).await.unwrap().sellable, 3);
    }

    #[tokio::test]
    async fn test_commit_emits_low_stock_alert() {
        let (watch, mut alerts) = crate::watch::LowStockWatch::channel(5);
        let db = Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .with_low_stock_watch(watch);
        let p1 = seeded(&db, "P1", 6).await;
        let manager = db.manager();

        manager
            .reserve("sess-a", &[ReserveItem::new(&p1, 2)], 900)
            .await
            .unwrap();
        manager.commit("sess-a", "O1", Some("clerk-7")).await.unwrap();

        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert.product_id, p1);
        assert_eq!(alert.on_hand, 4);
    }

    #[tokio::test]
    async fn test_multi_product_commit_keeps_ledgers_consistent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p1 = seeded(&db, "P1", 4).await;
        let p2 = seeded(&db, "P2", 7).await;
        let manager = db.manager();

        manager
            .reserve(
                "sess-a",
                &[ReserveItem::new(&p1, 1), ReserveItem::new(&p2, 3)],
                900,
            )
            .await
            .unwrap();
        let movements = manager.commit("sess-a", "O2", None).await.unwrap();
        assert_eq!(movements.len(), 2);

        for pid in [&p1, &p2] {
            let check = db.mutator().verify_ledger(pid).await.unwrap();
            assert!(check.consistent, "{check:?}");
        }
        assert_eq!(db.products().require(&p1).await.unwrap().on_hand, 3);
        assert_eq!(db.products().require(&p2).await.unwrap().on_hand, 4);
    }
}
