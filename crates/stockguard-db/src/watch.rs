//! # Low-Stock Watch
//!
//! Out-of-band signal raised when a decreasing movement leaves a product
//! at or below its restock threshold.
//!
//! The engine only *emits*; formatting and delivery (email, dashboards)
//! belong to whatever collaborator holds the receiver. A dropped receiver
//! never fails a stock operation - alerts are advisory, sales are not.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use stockguard_core::DEFAULT_LOW_STOCK_THRESHOLD;

/// One low-stock signal. Serializable so the consuming collaborator can
/// forward it to whatever delivery channel it uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockAlert {
    /// Product that crossed the threshold.
    pub product_id: String,

    /// On-hand count after the movement that triggered the alert.
    pub on_hand: i64,
}

/// Emitting half of the low-stock channel, cloned into the reservation
/// manager and stock mutator.
#[derive(Debug, Clone)]
pub struct LowStockWatch {
    threshold: i64,
    tx: mpsc::UnboundedSender<LowStockAlert>,
}

impl LowStockWatch {
    /// Creates a watch with the given threshold and returns the receiving
    /// half for the alert collaborator.
    pub fn channel(threshold: i64) -> (Self, mpsc::UnboundedReceiver<LowStockAlert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (LowStockWatch { threshold, tx }, rx)
    }

    /// Creates a watch with [`DEFAULT_LOW_STOCK_THRESHOLD`].
    pub fn with_default_threshold() -> (Self, mpsc::UnboundedReceiver<LowStockAlert>) {
        Self::channel(DEFAULT_LOW_STOCK_THRESHOLD)
    }

    /// The configured threshold.
    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Emits an alert when `on_hand` is at or below the threshold.
    ///
    /// Called by the engine after a *committed* decreasing movement, never
    /// from inside the transaction - an alert must not observe state that
    /// might roll back.
    pub(crate) fn notify(&self, product_id: &str, on_hand: i64) {
        if on_hand > self.threshold {
            return;
        }

        if self
            .tx
            .send(LowStockAlert {
                product_id: product_id.to_string(),
                on_hand,
            })
            .is_err()
        {
            debug!(product_id, "low-stock receiver dropped, alert discarded");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_below_threshold() {
        let (watch, mut rx) = LowStockWatch::channel(5);

        watch.notify("p1", 3);
        let alert = rx.recv().await.unwrap();
        assert_eq!(alert.product_id, "p1");
        assert_eq!(alert.on_hand, 3);
    }

    #[tokio::test]
    async fn test_no_alert_above_threshold() {
        let (watch, mut rx) = LowStockWatch::channel(5);

        watch.notify("p1", 6);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_harmless() {
        let (watch, rx) = LowStockWatch::channel(5);
        drop(rx);

        // Must not panic or error.
        watch.notify("p1", 0);
    }
}
