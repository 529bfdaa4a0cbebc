//! # Database Migrations
//!
//! Embedded SQL migrations for Stockguard.
//!
//! ## How Migrations Work
//! The `sqlx::migrate!()` macro embeds all SQL files from
//! `migrations/sqlite/` into the binary at compile time; `run_migrations`
//! applies pending ones in order and records them in `_sqlx_migrations`.
//! Idempotent - safe to run on every startup.
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql` (e.g., `002_add_warehouse_column.sql`)
//! 3. Write idempotent SQL (use `IF NOT EXISTS` where possible)
//! 4. **NEVER** modify existing migrations - always add new ones

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// ## Safety
/// - Idempotent: safe to run multiple times
/// - Transactional: each migration runs in a transaction
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Applying pending migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}
