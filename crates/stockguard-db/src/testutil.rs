//! Test fixtures shared across the crate's test modules.

use std::env;

use uuid::Uuid;

use crate::pool::{Database, DbConfig};

/// A file-backed database in the system temp directory.
///
/// Most tests use `DbConfig::in_memory()`; concurrency tests need a
/// file-backed store so multiple pooled connections can genuinely
/// interleave (in-memory SQLite is limited to one connection).
pub(crate) async fn temp_database() -> Database {
    let path = env::temp_dir().join(format!("stockguard-test-{}.db", Uuid::new_v4()));
    Database::new(DbConfig::new(path).max_connections(8))
        .await
        .expect("temp database")
}
