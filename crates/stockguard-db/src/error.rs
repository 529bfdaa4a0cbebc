//! # Database Error Types
//!
//! Error types for database operations, plus the unified `EngineError`
//! returned by engine components.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← classifies busy/locked as transient Busy      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EngineError = Core | Db ← what reserve/commit/apply_delta return      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller maps to its surface (409 / 422 / 5xx-equivalents)              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Busy Classification
//! Under WAL, a transaction that read a snapshot and then loses the write
//! race fails with SQLITE_BUSY / SQLITE_BUSY_SNAPSHOT ("database is
//! locked"). Those are not failures of the request, they are the store
//! telling us to re-run the check - so they map to [`DbError::Busy`] and
//! the engine retries with fresh reads.

use thiserror::Error;

use stockguard_core::CoreError;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and caller feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate SKU
    /// - Any UNIQUE index violation
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Reserving against a product id that was deleted mid-flight
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The store is busy: a lock or WAL snapshot conflict.
    ///
    /// Transient. Safe to retry with backoff; the engine does so itself a
    /// bounded number of times before surfacing this.
    #[error("Store busy: lock contention, retry")]
    Busy,

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use past the acquire timeout).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True for conditions that a retry with fresh reads can resolve.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Busy | DbError::PoolExhausted)
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound      → DbError::NotFound
/// sqlx::Error::Database(busy)   → DbError::Busy        (locked / snapshot)
/// sqlx::Error::Database(unique) → DbError::UniqueViolation
/// sqlx::Error::Database(fk)     → DbError::ForeignKeyViolation
/// sqlx::Error::PoolTimedOut     → DbError::PoolExhausted
/// Other                         → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();

                // SQLITE_BUSY (5), SQLITE_LOCKED (6) and their extended
                // codes (261 = BUSY_RECOVERY, 517 = BUSY_SNAPSHOT). sqlx
                // reports the extended code when SQLite provides one.
                if matches!(code.as_str(), "5" | "6" | "261" | "517" | "262")
                    || msg.contains("database is locked")
                    || msg.contains("database table is locked")
                {
                    DbError::Busy
                } else if msg.contains("UNIQUE constraint failed") {
                    // Parse the field name from the error message
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Engine Error
// =============================================================================

/// Unified error for engine operations (reserve, commit, apply_delta, ...).
///
/// Business outcomes (`InsufficientStock`, `ReservationExpired`, ...) come
/// through the `Core` arm; storage trouble through the `Db` arm. Callers
/// that only care about retryability use [`EngineError::is_retryable`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl EngineError {
    /// True when the operation may be retried as-is (transient contention).
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Db(db) if db.is_retryable())
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(DbError::from(err))
    }
}

impl From<stockguard_core::ValidationError> for EngineError {
    fn from(err: stockguard_core::ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
