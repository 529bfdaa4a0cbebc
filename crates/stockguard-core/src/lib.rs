//! # stockguard-core: Pure Business Logic for Stockguard
//!
//! This crate is the **heart** of the inventory reservation engine. It
//! contains the domain types and rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Stockguard Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            External Collaborators (not in this repo)            │   │
//! │  │   checkout service ── admin inventory ── alert delivery         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  stockguard-db (Engine Layer)                   │   │
//! │  │   reservation manager, stock mutator, sweeper, repositories    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ stockguard-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  ledger   │  │   error   │  │ validation│  │   │
//! │  │   │  Product  │  │  replay   │  │ taxonomy  │  │   rules   │  │   │
//! │  │   │ Movement  │  │  chain    │  │           │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Reservation, StockMovement, etc.)
//! - [`ledger`] - Ledger replay and chain verification math
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Quantities**: Stock counts are i64, never floats
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use stockguard_core::StockMovement` instead of
// `use stockguard_core::types::StockMovement`

pub use error::{CoreError, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default time-to-live for a checkout hold, in seconds (15 minutes).
///
/// ## Business Reason
/// Long enough for a shopper to enter payment details, short enough that
/// abandoned carts return stock to the shelf within the same browsing
/// session of other shoppers.
pub const DEFAULT_RESERVATION_TTL_SECS: i64 = 15 * 60;

/// Upper bound on a caller-supplied reservation TTL, in seconds (24 hours).
///
/// A TTL beyond this is almost certainly a caller bug (milliseconds passed
/// as seconds) and would pin stock for days.
pub const MAX_RESERVATION_TTL_SECS: i64 = 24 * 60 * 60;

/// On-hand level at or below which a low-stock signal is emitted.
///
/// Matches the threshold the storefront's restock alerts were tuned to.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Maximum line items allowed in a single reservation request.
///
/// ## Business Reason
/// Prevents runaway carts and keeps the reserve transaction short; a long
/// transaction holds the product write lock longer than necessary.
pub const MAX_RESERVE_ITEMS: usize = 100;

/// Maximum quantity of a single product per reservation line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Default page size when listing stock movements.
pub const DEFAULT_MOVEMENT_PAGE: u32 = 50;
