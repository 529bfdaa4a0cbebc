//! # Reservation Repository
//!
//! Database operations for stock reservations (checkout holds).
//!
//! Holds never touch `products.on_hand` - they only suppress the sellable
//! quantity until committed, released, or swept. The reserve path itself
//! (availability check + insert in one transaction) lives in
//! [`crate::manager::ReservationManager`]; this repository carries the
//! single-statement operations and test fixtures.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use stockguard_core::Reservation;

/// Repository for reservation database operations.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Inserts a hold row directly, bypassing the availability check.
    ///
    /// ## When To Use
    /// Fixtures and recovery tooling only. Checkout traffic must go
    /// through `ReservationManager::reserve`, which checks availability
    /// in the same transaction as the insert.
    pub async fn insert(&self, reservation: &Reservation) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_reservations (
                id, product_id, quantity, session_id, created_at, expires_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&reservation.id)
        .bind(&reservation.product_id)
        .bind(reservation.quantity)
        .bind(&reservation.session_id)
        .bind(reservation.created_at)
        .bind(reservation.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Builds a hold row with a fresh id.
    pub fn build(
        product_id: &str,
        quantity: i64,
        session_id: &str,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Reservation {
        Reservation {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            quantity,
            session_id: session_id.to_string(),
            created_at,
            expires_at,
        }
    }

    /// All holds owned by a session, oldest first.
    pub async fn for_session(&self, session_id: &str) -> DbResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, product_id, quantity, session_id, created_at, expires_at
            FROM stock_reservations
            WHERE session_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sum of held quantity for a product across unexpired holds.
    pub async fn active_quantity(&self, product_id: &str, now: DateTime<Utc>) -> DbResult<i64> {
        let sum: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(quantity)
            FROM stock_reservations
            WHERE product_id = ?1 AND expires_at > ?2
            "#,
        )
        .bind(product_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum.unwrap_or(0))
    }

    /// Deletes every hold owned by a session. Idempotent - returns the
    /// number of rows removed, which may be zero.
    pub async fn delete_for_session(&self, session_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM stock_reservations WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        let released = result.rows_affected();
        debug!(session_id, released, "Released session holds");
        Ok(released)
    }

    /// Deletes holds that lapsed before `now`.
    ///
    /// A hold created after `now` was captured necessarily has
    /// `expires_at > now` (TTLs are positive), so it can never match.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM stock_reservations WHERE expires_at < ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Counts all hold rows (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_reservations")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    async fn db_with_product() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().register("SKU-1", "Widget").await.unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_active_quantity_ignores_expired() {
        let (db, product_id) = db_with_product().await;
        let repo = db.reservations();
        let now = Utc::now();

        let live = ReservationRepository::build(
            &product_id,
            2,
            "sess-a",
            now,
            now + Duration::seconds(60),
        );
        let lapsed = ReservationRepository::build(
            &product_id,
            3,
            "sess-b",
            now - Duration::seconds(120),
            now - Duration::seconds(60),
        );
        repo.insert(&live).await.unwrap();
        repo.insert(&lapsed).await.unwrap();

        assert_eq!(repo.active_quantity(&product_id, now).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_for_session_is_idempotent() {
        let (db, product_id) = db_with_product().await;
        let repo = db.reservations();
        let now = Utc::now();

        let hold = ReservationRepository::build(
            &product_id,
            1,
            "sess-a",
            now,
            now + Duration::seconds(60),
        );
        repo.insert(&hold).await.unwrap();

        assert_eq!(repo.delete_for_session("sess-a").await.unwrap(), 1);
        // Second call: nothing left, still no error.
        assert_eq!(repo.delete_for_session("sess-a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_expired_leaves_future_holds() {
        let (db, product_id) = db_with_product().await;
        let repo = db.reservations();
        let now = Utc::now();

        let lapsed = ReservationRepository::build(
            &product_id,
            1,
            "sess-a",
            now - Duration::seconds(120),
            now - Duration::seconds(1),
        );
        let live = ReservationRepository::build(
            &product_id,
            1,
            "sess-b",
            now,
            now + Duration::seconds(60),
        );
        repo.insert(&lapsed).await.unwrap();
        repo.insert(&live).await.unwrap();

        assert_eq!(repo.delete_expired(now).await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
