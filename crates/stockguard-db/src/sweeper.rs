//! # Expiry Sweeper
//!
//! Reclaims lapsed checkout holds.
//!
//! Sweeping is pure garbage collection: a hold never decremented on-hand
//! stock, so deleting it writes NO ledger entry - the held quantity simply
//! stops suppressing the sellable count (which, for lapsed holds, the
//! availability evaluator already ignores; the sweep keeps the table
//! small and the sums cheap).
//!
//! ## Timing Safety
//! `sweep(now)` deletes rows with `expires_at < now`. A hold created
//! after `now` was captured carries `expires_at = creation + ttl > now`,
//! so a racing sweep can never delete it. Racing a sweep with a reserve
//! on the same lapsed row is last-writer-consistent: either order leaves
//! the same availability.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::DbResult;
use crate::repository::reservation::ReservationRepository;

/// Deletes expired reservations, on demand or on a schedule.
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    pool: SqlitePool,
}

impl ExpirySweeper {
    /// Creates a new ExpirySweeper.
    pub fn new(pool: SqlitePool) -> Self {
        ExpirySweeper { pool }
    }

    /// Deletes every hold that lapsed before `now`; returns the count.
    ///
    /// Callers may pass `Utc::now()` or, for administrative replays, any
    /// captured instant.
    pub async fn sweep(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let swept = ReservationRepository::new(self.pool.clone())
            .delete_expired(now)
            .await?;

        if swept > 0 {
            info!(count = swept, "Reclaimed expired reservations");
        }

        Ok(swept)
    }

    /// Runs `sweep` forever on a fixed interval.
    ///
    /// Abort the returned handle on shutdown. Sweep failures are logged
    /// and the loop continues - a missed pass only delays reclamation,
    /// availability reads already treat lapsed holds as vacated.
    pub fn spawn(self, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if let Err(e) = self.sweep(Utc::now()).await {
                    warn!(error = %e, "Expiry sweep failed");
                }
            }
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration as ChronoDuration;
    use stockguard_core::{MovementKind, ReserveItem};

    #[tokio::test]
    async fn test_short_ttl_hold_is_reclaimed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().register("SKU-1", "Widget").await.unwrap();
        db.mutator()
            .apply_delta(&product.id, 2, MovementKind::Restock, "receiving", None, None)
            .await
            .unwrap();

        db.manager()
            .reserve("sess-a", &[ReserveItem::new(&product.id, 2)], 1)
            .await
            .unwrap();
        assert_eq!(db.availability().sellable(&product.id).await.unwrap().sellable, 0);

        // Directly once now > expires_at the hold stops counting, even
        // before any sweep runs.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(db.availability().sellable(&product.id).await.unwrap().sellable, 2);

        // The sweep then physically removes the row, writing no movement.
        let swept = db
            .sweeper()
            .sweep(Utc::now() + ChronoDuration::seconds(2))
            .await
            .unwrap();
        assert_eq!(swept, 1);
        assert_eq!(db.reservations().count().await.unwrap(), 0);
        assert_eq!(db.movements().count_for_product(&product.id).await.unwrap(), 1);
        assert_eq!(db.products().require(&product.id).await.unwrap().on_hand, 2);
    }

    #[tokio::test]
    async fn test_sweep_spares_unexpired_holds() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().register("SKU-1", "Widget").await.unwrap();
        db.mutator()
            .apply_delta(&product.id, 5, MovementKind::Restock, "receiving", None, None)
            .await
            .unwrap();

        db.manager()
            .reserve("sess-a", &[ReserveItem::new(&product.id, 1)], 900)
            .await
            .unwrap();

        assert_eq!(db.sweeper().sweep(Utc::now()).await.unwrap(), 0);
        assert_eq!(db.reservations().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sweep_on_empty_table() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.sweeper().sweep(Utc::now()).await.unwrap(), 0);
    }
}
