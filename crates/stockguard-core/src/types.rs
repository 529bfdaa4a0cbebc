//! # Domain Types
//!
//! Core domain types used throughout Stockguard.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  Reservation    │   │ StockMovement   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  product_id     │   │  product_id     │       │
//! │  │  name           │   │  session_id     │   │  delta (signed) │       │
//! │  │  on_hand        │   │  quantity       │   │  kind           │       │
//! │  └─────────────────┘   │  expires_at     │   │  before / after │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  MovementKind   │   │  SellableStock  │   │  ReserveItem    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Sale           │   │  on_hand        │   │  product_id     │       │
//! │  │  Restock        │   │  sellable       │   │  quantity       │       │
//! │  │  ...            │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## On-Hand vs Sellable
//! `on_hand` is what physically sits on the shelf; `sellable` is `on_hand`
//! minus every unexpired hold. Reservations never mutate `on_hand` - they
//! only suppress `sellable`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Product
// =============================================================================

/// A product whose stock this engine guards.
///
/// Catalog attributes (price, description, images) belong to the external
/// catalog service; the engine only carries what stock control needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name, carried for alert context.
    pub name: String,

    /// Units physically in stock. Never negative.
    pub on_hand: i64,

    /// When the product was registered with the engine.
    pub created_at: DateTime<Utc>,

    /// When stock for the product was last touched.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Reservation
// =============================================================================

/// A time-bounded hold on a product's stock, keyed by checkout session.
///
/// A reservation does NOT decrement `on_hand`; it suppresses the sellable
/// quantity until it is committed, released, or swept after expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Reservation {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Product being held.
    pub product_id: String,

    /// Units held. Always positive.
    pub quantity: i64,

    /// Opaque checkout-session identifier. Not necessarily an
    /// authenticated user - guests reserve too.
    pub session_id: String,

    /// When the hold was taken.
    pub created_at: DateTime<Utc>,

    /// Instant the hold lapses. A reservation is active while
    /// `expires_at > now`.
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether the hold has lapsed at the given instant.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Why a stock movement happened.
///
/// Stored as snake_case TEXT in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum MovementKind {
    /// Staff corrected the count by hand.
    ManualAdjustment,
    /// A committed checkout consumed held stock.
    Sale,
    /// New inventory arrived.
    Restock,
    /// A cancelled order returned its units.
    CancellationReversal,
    /// An expired hold's units were put back by an admin correction.
    ExpiryReversal,
}

impl MovementKind {
    /// The snake_case label stored in the ledger and shown in audit views.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::ManualAdjustment => "manual_adjustment",
            MovementKind::Sale => "sale",
            MovementKind::Restock => "restock",
            MovementKind::CancellationReversal => "cancellation_reversal",
            MovementKind::ExpiryReversal => "expiry_reversal",
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry in the stock ledger.
///
/// ## Audit Invariant
/// For a product, replaying every movement in commit order reproduces the
/// current `on_hand` exactly; `on_hand` is a cached projection of this
/// ledger. Entries are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Product whose stock moved.
    pub product_id: String,

    /// Signed change applied to `on_hand`. Negative for sales and manual
    /// decreases, positive for restocks and reversals.
    pub delta: i64,

    /// Why the stock moved.
    pub kind: MovementKind,

    /// Free-text operator- or system-supplied reason.
    pub reason: String,

    /// Order this movement settled, when kind is sale or a reversal.
    pub order_id: Option<String>,

    /// Staff member or system actor that triggered the movement.
    pub actor_id: Option<String>,

    /// On-hand count immediately before the movement.
    pub on_hand_before: i64,

    /// On-hand count immediately after the movement.
    pub on_hand_after: i64,

    /// When the movement was committed.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Engine Request / Response Types
// =============================================================================

/// One line of a reservation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveItem {
    /// Product to hold.
    pub product_id: String,

    /// Units to hold. Must be at least 1.
    pub quantity: i64,
}

impl ReserveItem {
    /// Convenience constructor used by callers and tests.
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        ReserveItem {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Returned by a successful reserve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationReceipt {
    /// Instant every hold in the batch lapses.
    pub expires_at: DateTime<Utc>,
}

/// Availability snapshot for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellableStock {
    /// Product the snapshot describes.
    pub product_id: String,

    /// Units physically in stock.
    pub on_hand: i64,

    /// Units a new shopper could reserve right now:
    /// `on_hand` minus all unexpired holds, floored at zero.
    pub sellable: i64,
}

/// Result of auditing a product's ledger against its cached on-hand count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerCheck {
    /// Product audited.
    pub product_id: String,

    /// Cached on-hand count from the products table.
    pub on_hand: i64,

    /// On-hand count reproduced by replaying the ledger.
    pub replayed: i64,

    /// Number of movements replayed.
    pub movements: usize,

    /// True when the chain links cleanly and `replayed == on_hand`.
    pub consistent: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================
