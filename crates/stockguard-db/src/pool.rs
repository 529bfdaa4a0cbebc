//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Service Startup                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ Concurrent checkout requests, one connection each              │
//! │       ▼                                                                 │
//! │  reserve() ──► txn on Conn1 ─┐                                         │
//! │  reserve() ──► txn on Conn2 ─┤ writers serialize inside SQLite;        │
//! │  commit()  ──► txn on Conn3 ─┘ losers of a snapshot race get Busy      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Snapshot-isolated reads that don't block the writer
//! - A single serialized writer, which is what makes the
//!   check-then-insert in `reserve` safe
//! - Better crash recovery

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::availability::AvailabilityEvaluator;
use crate::error::{DbError, DbResult};
use crate::manager::ReservationManager;
use crate::migrations;
use crate::mutator::StockMutator;
use crate::repository::movement::MovementRepository;
use crate::repository::product::ProductRepository;
use crate::repository::reservation::ReservationRepository;
use crate::sweeper::ExpirySweeper;
use crate::watch::LowStockWatch;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/stockguard/stock.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Pool acquire timeout. Exceeding it surfaces `PoolExhausted`,
    /// never a hang.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long SQLite waits on a locked database before reporting busy.
    /// Bounded so contended callers get a transient `Busy`, not a hang.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the pool acquire timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the SQLite busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let config = DbConfig::in_memory();
    /// let db = Database::new(config).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    ///
    /// In-memory databases are limited to a single connection, so
    /// concurrency tests that need real connection interleaving should use
    /// a temp-file database instead.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(1),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing access to repositories and the engine
/// components built on them.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./stock.db")).await?;
/// let (watch, mut alerts) = LowStockWatch::channel(5);
/// let db = db.with_low_stock_watch(watch);
///
/// let receipt = db.manager().reserve("sess-1", &items, 900).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Low-stock signal emitter shared by commit and adjustment paths.
    watch: Option<LowStockWatch>,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite for safe concurrent checkout traffic:
    ///    - WAL mode (snapshot reads, serialized writer)
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled
    ///    - Bounded busy timeout
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // sqlite://path?mode=rwc creates the file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            // WAL mode: snapshot reads plus one serialized writer. The
            // write serialization is what closes the check-then-insert
            // race in reserve().
            .journal_mode(SqliteJournalMode::Wal)
            // NORMAL synchronous: safe from corruption, may lose the last
            // transaction on power loss
            .synchronous(SqliteSynchronous::Normal)
            // Enable foreign key constraints
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            // Bounded wait on lock contention, then report busy
            .busy_timeout(config.busy_timeout)
            // Create file if it doesn't exist
            .create_if_missing(true);

        debug!("Connection options configured");

        // Build the pool
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool, watch: None };

        // Run migrations if enabled
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Attaches a low-stock watch; commit and adjustment paths emit
    /// through it after decreasing movements.
    pub fn with_low_stock_watch(mut self, watch: LowStockWatch) -> Self {
        self.watch = Some(watch);
        self
    }

    /// Runs database migrations.
    ///
    /// ## When To Call
    /// - Automatically called by `new()` if `run_migrations` is true
    /// - Manually call when migrations are disabled in config
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// For advanced queries not covered by repositories.
    /// Prefer using repository methods when available.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the product repository.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Returns the reservation repository.
    pub fn reservations(&self) -> ReservationRepository {
        ReservationRepository::new(self.pool.clone())
    }

    /// Returns the stock movement repository.
    pub fn movements(&self) -> MovementRepository {
        MovementRepository::new(self.pool.clone())
    }

    /// Returns the availability evaluator.
    pub fn availability(&self) -> AvailabilityEvaluator {
        AvailabilityEvaluator::new(self.pool.clone())
    }

    /// Returns the reservation manager (reserve / release / commit).
    pub fn manager(&self) -> ReservationManager {
        ReservationManager::new(self.pool.clone(), self.watch.clone())
    }

    /// Returns the stock mutator (manual/admin stock deltas).
    pub fn mutator(&self) -> StockMutator {
        StockMutator::new(self.pool.clone(), self.watch.clone())
    }

    /// Returns the expiry sweeper.
    pub fn sweeper(&self) -> ExpirySweeper {
        ExpirySweeper::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    ///
    /// ## When To Call
    /// - On application shutdown
    ///
    /// ## Note
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
