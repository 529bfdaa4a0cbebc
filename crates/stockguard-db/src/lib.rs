//! # stockguard-db: Database Layer for Stockguard
//!
//! All database operations for the inventory reservation engine: pool
//! management, embedded migrations, repositories, and the engine
//! components that own every transaction boundary.
//!
//! ## Component Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        stockguard-db                                    │
//! │                                                                         │
//! │  Database (pool.rs) ── hands out everything below                      │
//! │      │                                                                  │
//! │      ├── AvailabilityEvaluator  sellable = on_hand − active holds      │
//! │      ├── ReservationManager     reserve / release / commit             │
//! │      ├── StockMutator           apply_delta / verify_ledger            │
//! │      ├── ExpirySweeper          sweep(now) / spawn(interval)           │
//! │      │                                                                  │
//! │      ├── ProductRepository      products table                         │
//! │      ├── ReservationRepository  stock_reservations table               │
//! │      └── MovementRepository     stock_movements ledger (append-only)   │
//! │                                                                         │
//! │  LowStockWatch (watch.rs) ── alert channel fed by decreasing moves     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//! ```rust,ignore
//! use stockguard_db::{Database, DbConfig, LowStockWatch};
//! use stockguard_core::{ReserveItem, DEFAULT_RESERVATION_TTL_SECS};
//!
//! let (watch, mut alerts) = LowStockWatch::with_default_threshold();
//! let db = Database::new(DbConfig::new("./stock.db"))
//!     .await?
//!     .with_low_stock_watch(watch);
//!
//! // Background reclamation every two minutes.
//! let sweeper = db.sweeper().spawn(std::time::Duration::from_secs(120));
//!
//! let receipt = db
//!     .manager()
//!     .reserve("sess-1", &items, DEFAULT_RESERVATION_TTL_SECS)
//!     .await?;
//! // ... shopper pays ...
//! let movements = db.manager().commit("sess-1", "order-17", None).await?;
//! ```

pub mod availability;
pub mod error;
pub mod manager;
pub mod migrations;
pub mod mutator;
pub mod pool;
pub mod repository;
pub mod sweeper;
pub mod watch;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types for convenience
pub use availability::AvailabilityEvaluator;
pub use error::{DbError, DbResult, EngineError, EngineResult};
pub use manager::ReservationManager;
pub use mutator::StockMutator;
pub use pool::{Database, DbConfig};
pub use repository::movement::MovementRepository;
pub use repository::product::ProductRepository;
pub use repository::reservation::ReservationRepository;
pub use sweeper::ExpirySweeper;
pub use watch::{LowStockAlert, LowStockWatch};
