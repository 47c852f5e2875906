//! # Repository Module
//!
//! Database repository implementations for Stock Ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Inventory service                                                     │
//! │       │                                                                 │
//! │       │  let mut tx = pool.begin().await?;                             │
//! │       │  ItemRepository::get(&mut *tx, id)                             │
//! │       │  MovementRepository::insert(&mut *tx, &movement)               │
//! │       │  tx.commit().await?;                                           │
//! │       ▼                                                                 │
//! │  Repositories (stateless, generic over sqlx::Executor)                 │
//! │  ├── the same call works on &SqlitePool or inside a transaction        │
//! │  └── one SQL statement per function                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`] - Category CRUD
//! - [`SupplierRepository`] - Supplier CRUD
//! - [`ItemRepository`] - Item CRUD, balance cache, row claim
//! - [`MovementRepository`] - Ledger entries per item

pub mod category;
pub mod item;
pub mod movement;
pub mod supplier;

pub use category::CategoryRepository;
pub use item::ItemRepository;
pub use movement::MovementRepository;
pub use supplier::SupplierRepository;
