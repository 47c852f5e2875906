//! # Seed Data Generator
//!
//! Populates the database with demo inventory for development.
//!
//! ## Usage
//! ```bash
//! # Seed 3 items per category (default)
//! cargo run -p stockledger-db --bin seed
//!
//! # Seed a custom amount
//! cargo run -p stockledger-db --bin seed -- --count 10
//!
//! # Specify database path (overrides config.toml)
//! cargo run -p stockledger-db --bin seed -- --db ./data/stock.db
//! ```
//!
//! ## Generated Data
//! - Categories: Tools, Electronics, Furniture, Lab Equipment
//! - Suppliers: two demo vendors, items alternate between them
//! - Items with a requested quantity (one compensating inbound each)
//! - A loan on every other item, half of it returned

use std::env;
use std::path::PathBuf;

use chrono::NaiveDate;
use stockledger_core::{
    Category, Item, MovementType, NewCategory, NewItem, NewMovement, NewSupplier, Supplier,
};
use stockledger_db::{init_tracing, Database, Inventory, RequestContext, StockConfig};

/// Categories and the item names drawn for each.
const CATALOG: &[(&str, &[&str])] = &[
    (
        "Tools",
        &["Cordless Drill", "Angle Grinder", "Torque Wrench", "Laser Level", "Heat Gun"],
    ),
    (
        "Electronics",
        &["Oscilloscope", "Bench Power Supply", "Soldering Station", "Multimeter", "Projector"],
    ),
    (
        "Furniture",
        &["Standing Desk", "Office Chair", "Filing Cabinet", "Whiteboard", "Bookshelf"],
    ),
    (
        "Lab Equipment",
        &["Microscope", "Centrifuge", "Hot Plate", "Pipette Set", "Analytical Balance"],
    ),
];

const SUPPLIERS: &[(&str, &str)] = &[
    ("Northwind Supply", "orders@northwind.example"),
    ("Contoso Industrial", "sales@contoso.example"),
];

const LOCATIONS: &[&str] = &["Warehouse A", "Warehouse B", "Lab 2", "Front Office"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 3;
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stock Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Items per category (default: 3, max: 5)");
                println!("  -d, --db <PATH>      Database file path (overrides config)");
                println!("      --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing();

    let mut config = StockConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("🌱 Stock Ledger Seed Data Generator");
    println!("===================================");
    println!("Database: {}", config.database.path.display());
    println!("Items per category: {}", count);
    println!();

    let db = Database::new(config.db_config()).await?;
    let inventory = db.inventory_with(config.labels.clone());

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = inventory.list_items(None).await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let ctx = RequestContext::with_actor("seed");
    let start = std::time::Instant::now();

    let suppliers = seed_suppliers(&inventory, &ctx).await?;
    println!("✓ Created {} suppliers", suppliers.len());

    let mut items = Vec::new();
    for (category_idx, (category_name, names)) in CATALOG.iter().enumerate() {
        let category = inventory
            .create_category(
                &ctx,
                NewCategory {
                    name: category_name.to_string(),
                    description: Some(format!("Demo {} inventory", category_name.to_lowercase())),
                },
            )
            .await?;

        for (item_idx, name) in names.iter().take(count).enumerate() {
            let seed = category_idx * 10 + item_idx;
            let supplier = &suppliers[seed % suppliers.len()];
            match inventory
                .create_item(&ctx, generate_item(&category, supplier, name, seed))
                .await
            {
                Ok(item) => items.push(item),
                Err(e) => eprintln!("Failed to create {}: {}", name, e),
            }
        }
    }
    println!("✓ Created {} items", items.len());

    let loans = seed_loans(&inventory, &ctx, &items).await?;
    println!("✓ Recorded {} loan movements", loans);

    let elapsed = start.elapsed();
    println!();
    println!("Balances:");
    for item in &items {
        let balance = inventory.ledger_balance(&item.id).await?;
        println!("  {:<24} {:>4}", item.name, balance);
    }

    db.close().await;

    println!();
    println!("✓ Seed complete in {:?}", elapsed);

    Ok(())
}

async fn seed_suppliers(
    inventory: &Inventory,
    ctx: &RequestContext,
) -> Result<Vec<Supplier>, Box<dyn std::error::Error>> {
    let mut suppliers = Vec::with_capacity(SUPPLIERS.len());
    for (name, email) in SUPPLIERS {
        let supplier = inventory
            .create_supplier(
                ctx,
                NewSupplier {
                    name: name.to_string(),
                    contact_email: Some(email.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        suppliers.push(supplier);
    }
    Ok(suppliers)
}

/// Loans out half the stock of every other item, then returns half of that.
async fn seed_loans(
    inventory: &Inventory,
    ctx: &RequestContext,
    items: &[Item],
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut recorded = 0;
    for item in items.iter().step_by(2) {
        let lent = item.available_quantity / 2;
        if lent == 0 {
            continue;
        }

        inventory
            .record_movement(
                ctx,
                NewMovement {
                    item_id: item.id.clone(),
                    quantity: lent,
                    movement_type: MovementType::Loaned,
                    movement_date: None,
                },
            )
            .await?;
        recorded += 1;

        let back = lent / 2;
        if back > 0 {
            inventory
                .record_movement(
                    ctx,
                    NewMovement {
                        item_id: item.id.clone(),
                        quantity: back,
                        movement_type: MovementType::Returned,
                        movement_date: None,
                    },
                )
                .await?;
            recorded += 1;
        }
    }
    Ok(recorded)
}

/// Builds a single item with deterministic demo values.
fn generate_item(category: &Category, supplier: &Supplier, name: &str, seed: usize) -> NewItem {
    // Requested stock: 1-12
    let requested_quantity = 1 + (seed * 7 % 12) as i32;

    // Value: 25.00 - 1,024.00
    let monetary_value = 25.0 + ((seed * 137) % 1000) as f64;

    let acquisition_date = NaiveDate::from_ymd_opt(2018 + (seed % 6) as i32, 1 + (seed % 12) as u32, 1);

    NewItem {
        name: name.to_string(),
        category_id: category.id.clone(),
        supplier_id: Some(supplier.id.clone()),
        description: None,
        acquisition_date,
        location: Some(LOCATIONS[seed % LOCATIONS.len()].to_string()),
        monetary_value,
        market_reference: Some(format!("MR-{:05}", 10_000 + seed * 31)),
        requested_quantity,
    }
}
