//! # Product Repository
//!
//! Database operations for the products table.
//!
//! The engine guards stock for products registered here; catalog details
//! (pricing, descriptions, media) live with the external catalog service.
//! Products are registered with `on_hand = 0` and receive opening stock
//! through a restock movement, so the ledger is complete from birth.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockguard_core::Product;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Registers a product with the engine, starting at zero stock.
    ///
    /// ## Returns
    /// * `Ok(Product)` - the registered product
    /// * `Err(DbError::UniqueViolation)` - SKU already registered
    pub async fn register(&self, sku: &str, name: &str) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: sku.to_string(),
            name: name.to_string(),
            on_hand: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(sku = %product.sku, id = %product.id, "Registering product");

        sqlx::query(
            r#"
            INSERT INTO products (id, sku, name, on_hand, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.on_hand)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, on_hand, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, on_hand, created_at, updated_at
            FROM products
            WHERE sku = ?1
            "#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID, failing with NotFound when absent.
    pub async fn require(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts registered products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
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
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_register_and_fetch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = repo.register("LBB-001", "Labubu Classic").await.unwrap();
        assert_eq!(product.on_hand, 0);

        let fetched = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.sku, "LBB-001");

        let by_sku = repo.get_by_sku("LBB-001").await.unwrap().unwrap();
        assert_eq!(by_sku.id, product.id);

        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.register("LBB-001", "Labubu Classic").await.unwrap();
        let err = repo.register("LBB-001", "Labubu Again").await.unwrap_err();
        assert!(matches!(err, crate::error::DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_require_missing_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.products().require("nope").await.unwrap_err();
        assert!(matches!(err, crate::error::DbError::NotFound { .. }));
    }
}
