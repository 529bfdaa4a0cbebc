//! # Seed Data Generator
//!
//! Populates a database with demo products and opening stock for
//! development.
//!
//! ## Usage
//! ```bash
//! # Default: ./stockguard.db, 24 products
//! cargo run -p stockguard-db --bin seed
//!
//! # Custom path
//! cargo run -p stockguard-db --bin seed -- --db ./data/stock.db
//! ```
//!
//! Products are registered at zero stock and receive their opening units
//! through a `restock` movement, so every seeded product has a complete,
//! replayable ledger from the start.

use std::env;

use stockguard_core::MovementKind;
use stockguard_db::{Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Collectible lines seeded for demos: (sku, name, opening stock).
const DEMO_PRODUCTS: &[(&str, &str, i64)] = &[
    ("LBB-CLS-001", "Labubu Classic", 40),
    ("LBB-CLS-002", "Labubu Classic Pink", 32),
    ("LBB-SEA-001", "Labubu Seaside", 18),
    ("LBB-SEA-002", "Labubu Tide Pool", 12),
    ("LBB-FOR-001", "Labubu Forest Fairy", 25),
    ("LBB-FOR-002", "Labubu Mushroom Cap", 9),
    ("LBB-SPC-001", "Labubu Astronaut", 6),
    ("LBB-SPC-002", "Labubu Moon Walk", 4),
    ("LBB-HOL-001", "Labubu Winter Holiday", 15),
    ("LBB-HOL-002", "Labubu Pumpkin Night", 11),
    ("LBB-LTD-001", "Labubu Limited Gold", 2),
    ("LBB-LTD-002", "Labubu Limited Silver", 3),
    ("MKK-CLS-001", "Mokoko Classic", 30),
    ("MKK-CLS-002", "Mokoko Blush", 27),
    ("MKK-SEA-001", "Mokoko Harbor", 14),
    ("MKK-FOR-001", "Mokoko Acorn", 21),
    ("MKK-SPC-001", "Mokoko Stargazer", 8),
    ("MKK-HOL-001", "Mokoko First Snow", 13),
    ("ZMB-CLS-001", "Zimomo Classic", 22),
    ("ZMB-CLS-002", "Zimomo Midnight", 16),
    ("ZMB-SEA-001", "Zimomo Lighthouse", 10),
    ("ZMB-FOR-001", "Zimomo Thorn", 7),
    ("ZMB-SPC-001", "Zimomo Nebula", 5),
    ("ZMB-LTD-001", "Zimomo Limited Jade", 1),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db_path = parse_db_path().unwrap_or_else(|| "./stockguard.db".to_string());

    info!(path = %db_path, "Seeding demo data");
    let db = Database::new(DbConfig::new(&db_path)).await?;

    let products = db.products();
    let mutator = db.mutator();
    let mut seeded = 0;

    for (sku, name, opening) in DEMO_PRODUCTS {
        // Skip products from a previous seed run.
        if products.get_by_sku(sku).await?.is_some() {
            continue;
        }

        let product = products.register(sku, name).await?;
        if *opening > 0 {
            mutator
                .apply_delta(
                    &product.id,
                    *opening,
                    MovementKind::Restock,
                    "opening stock",
                    None,
                    Some("seed"),
                )
                .await?;
        }
        seeded += 1;
    }

    info!(seeded, total = DEMO_PRODUCTS.len(), "Seed complete");
    db.close().await;
    Ok(())
}

/// Parses `--db <path>` from argv.
fn parse_db_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1))
        .cloned()
}
