//! # stockledger-db: Storage and Inventory Service for Stock Ledger
//!
//! This crate owns the SQLite store (sqlx), the repositories over it, and the
//! transactional [`Inventory`] service that keeps every item's cached balance
//! in step with its movement ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Stock Ledger Data Flow                              │
//! │                                                                         │
//! │  caller (seed bin, API layer, tests)                                   │
//! │       │  RequestContext + NewMovement                                   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockledger-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌────────────────┐   │   │
//! │  │   │   Inventory   │   │ Repositories  │   │   Migrations   │   │   │
//! │  │   │(inventory.rs) │──►│ CategoryRepo  │   │   (embedded)   │   │   │
//! │  │   │               │   │ SupplierRepo  │   │                │   │   │
//! │  │   │ ItemLocks     │   │ ItemRepo      │   │ 001_initial_   │   │   │
//! │  │   │ tx per call   │   │ MovementRepo  │   │ schema.sql     │   │   │
//! │  │   └──────┬────────┘   └───────────────┘   └────────────────┘   │   │
//! │  │          │ ArtifactRenderer (stockledger-labels)                │   │
//! │  └──────────┼──────────────────────────────────────────────────────┘   │
//! │             ▼                                                           │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`config`] - TOML configuration with environment overrides
//! - [`error`] - Database error types
//! - [`repository`] - Per-table query functions
//! - [`inventory`] - Transactional service (the write path)
//! - [`locks`] - Per-item async mutexes
//! - [`context`] - Request identity attached to tracing spans
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockledger_db::{Database, DbConfig, RequestContext};
//! use stockledger_core::{MovementType, NewMovement};
//!
//! let db = Database::new(DbConfig::new("stock.db")).await?;
//! let inventory = db.inventory();
//!
//! let ctx = RequestContext::with_actor("clerk-7");
//! inventory
//!     .record_movement(&ctx, NewMovement {
//!         item_id: drill.id.clone(),
//!         quantity: 3,
//!         movement_type: MovementType::Loaned,
//!         movement_date: None,
//!     })
//!     .await?;
//! ```

use tracing_subscriber::EnvFilter;

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod context;
pub mod error;
pub mod inventory;
pub mod locks;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, StockConfig};
pub use context::RequestContext;
pub use error::{DbError, DbResult};
pub use inventory::Inventory;
pub use locks::ItemLocks;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    CategoryRepository, ItemRepository, MovementRepository, SupplierRepository,
};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,stockledger=debug,sqlx=warn";

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stockledger_db=trace` - Trace the storage layer only
/// - Default: [`DEFAULT_LOG_FILTER`]
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_default_filter_levels() {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(DEFAULT_LOG_FILTER))
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(target: "stockledger_db::inventory", Level::DEBUG));
            assert!(!tracing::enabled!(target: "stockledger_db::inventory", Level::TRACE));
            assert!(tracing::enabled!(target: "sqlx::query", Level::WARN));
            assert!(!tracing::enabled!(target: "sqlx::query", Level::DEBUG));
            assert!(tracing::enabled!(target: "hyper", Level::INFO));
            assert!(!tracing::enabled!(target: "hyper", Level::DEBUG));
        });
    }
}
