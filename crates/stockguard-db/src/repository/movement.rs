//! # Stock Movement Repository
//!
//! Read access to the append-only stock ledger.
//!
//! Writes happen exclusively inside engine transactions (commit and
//! apply_delta append in the same unit of work as the stock update); this
//! repository never exposes an update or delete - the ledger is immutable
//! once written.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{DbError, DbResult};
use stockguard_core::StockMovement;

/// Appends one ledger entry on the caller's connection.
///
/// Only the engine's transactions call this: a movement must land in the
/// same unit of work as the stock write it describes.
pub(crate) async fn append_on(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, delta, kind, reason, order_id, actor_id,
            on_hand_before, on_hand_after, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.delta)
    .bind(movement.kind)
    .bind(&movement.reason)
    .bind(&movement.order_id)
    .bind(&movement.actor_id)
    .bind(movement.on_hand_before)
    .bind(movement.on_hand_after)
    .bind(movement.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Repository for stock-ledger reads.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// One page of a product's movements, newest first.
    ///
    /// Restartable: pass the previous page's `offset + limit` to continue.
    /// Ordering is commit order (rowid), so pages stay stable while new
    /// movements only prepend.
    ///
    /// ## Arguments
    /// * `product_id` - must exist, else `NotFound`
    /// * `limit` - page size
    /// * `offset` - rows to skip from the newest end
    pub async fn for_product(
        &self,
        product_id: &str,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<StockMovement>> {
        self.require_product(product_id).await?;

        let rows = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, delta, kind, reason, order_id, actor_id,
                   on_hand_before, on_hand_after, created_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY rowid DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Every movement for a product in commit order (oldest first), the
    /// order ledger replay expects.
    pub async fn replay_order(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        self.require_product(product_id).await?;

        let rows = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, delta, kind, reason, order_id, actor_id,
                   on_hand_before, on_hand_after, created_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY rowid ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Counts a product's movements (for diagnostics and paging UIs).
    pub async fn count_for_product(&self, product_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn require_product(&self, product_id: &str) -> DbResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        if exists.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use stockguard_core::MovementKind;

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.movements().for_product("ghost", 10, 0).await.unwrap_err();
        assert!(matches!(err, crate::error::DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_pages_are_newest_first_and_restartable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().register("SKU-1", "Widget").await.unwrap();
        let mutator = db.mutator();

        // Five restocks of +1..+5; newest is the +5.
        for delta in 1..=5 {
            mutator
                .apply_delta(&product.id, delta, MovementKind::Restock, "receiving", None, None)
                .await
                .unwrap();
        }

        let repo = db.movements();
        let first = repo.for_product(&product.id, 2, 0).await.unwrap();
        let second = repo.for_product(&product.id, 2, 2).await.unwrap();

        assert_eq!(first.iter().map(|m| m.delta).collect::<Vec<_>>(), vec![5, 4]);
        assert_eq!(second.iter().map(|m| m.delta).collect::<Vec<_>>(), vec![3, 2]);
        assert_eq!(repo.count_for_product(&product.id).await.unwrap(), 5);
    }
}
