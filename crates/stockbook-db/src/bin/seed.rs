//! # Seed Data Generator
//!
//! Populates the database with demo stock lots and a demo bill for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed the default dev database
//! cargo run -p stockbook-db --bin seed
//!
//! # Specify database path
//! cargo run -p stockbook-db --bin seed -- --db ./data/stockbook.db
//!
//! # Skip the demo bill
//! cargo run -p stockbook-db --bin seed -- --no-bill
//! ```

use std::env;

use stockbook_core::validation::parse_date;
use stockbook_core::{BillRequest, LineRequest, NewLot};
use stockbook_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

/// Demo lots: (product, type, place, unit, quantity, amount_cents, date)
const DEMO_LOTS: &[(&str, &str, &str, &str, i64, i64, &str)] = &[
    ("Cement", "OPC-53", "Godown A", "bag", 200, 45_000, "2026-06-01"),
    ("Cement", "OPC-53", "Godown A", "bag", 150, 47_500, "2026-07-10"),
    ("Cement", "PPC", "Godown A", "bag", 80, 41_000, "2026-06-20"),
    ("Steel Rod", "8mm", "Yard", "kg", 1000, 6_800, "2026-05-15"),
    ("Steel Rod", "12mm", "Yard", "kg", 750, 6_500, "2026-06-05"),
    ("Sand", "River", "Yard", "cft", 500, 5_200, "2026-07-01"),
    ("Brick", "Red Clay", "Godown B", "pcs", 5000, 1_200, "2026-06-12"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./stockbook_dev.db");
    let mut with_bill = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--no-bill" => {
                with_bill = false;
            }
            "--help" | "-h" => {
                println!("Stockbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./stockbook_dev.db)");
                println!("      --no-bill      Seed lots only, skip the demo bill");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockbook Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.lots().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} lots", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let service = db.billing();

    println!();
    println!("Seeding lots...");
    for (product, kind, place, unit, quantity, amount_cents, date) in DEMO_LOTS {
        let lot = service
            .record_intake(NewLot {
                product: (*product).to_string(),
                kind: (*kind).to_string(),
                place: (*place).to_string(),
                unit: (*unit).to_string(),
                quantity: *quantity,
                amount_cents: *amount_cents,
                date: parse_date("date", date)?,
            })
            .await
            .map_err(|e| format!("seeding {product}: {e}"))?;
        println!("  {} x{} @ {}", lot.product, lot.quantity, lot.amount());
    }

    if with_bill {
        println!();
        println!("Submitting demo bill (spans the two OPC-53 cement lots)...");
        let bill = service
            .submit_bill(BillRequest {
                bill_number: "DEMO-0001".to_string(),
                bill_date: parse_date("billDate", "2026-08-01")?,
                lines: vec![LineRequest {
                    product: "Cement".to_string(),
                    kind: "OPC-53".to_string(),
                    place: "Godown A".to_string(),
                    unit: "bag".to_string(),
                    quantity: 250,
                }],
            })
            .await
            .map_err(|e| format!("demo bill: {e}"))?;

        println!("{}", serde_json::to_string_pretty(&bill)?);
    }

    println!();
    println!("Remaining stock by key:");
    for summary in service.stock_summary(Default::default()).await? {
        println!(
            "  {}/{} at {}: {} {} remaining of {}",
            summary.product,
            summary.kind,
            summary.place,
            summary.remaining,
            summary.unit,
            summary.quantity
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
