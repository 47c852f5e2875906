//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  seed / host application startup                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StockConfig::db_config() ← Configure pool settings                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ Concurrent Inventory operations                                │
//! │       ▼                                                                 │
//! │  record_movement(item A) ──► tx on Conn1                               │
//! │  update_item(item B)     ──► tx on Conn2                               │
//! │  list_items()            ──► Conn3                                     │
//! │  (writes on the same item are serialized by ItemLocks)                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every connection runs with WAL journaling, `synchronous = NORMAL` and
//! foreign keys on. `:memory:` databases are per-connection in SQLite, so
//! [`DbConfig::in_memory`] pins the pool to a single connection.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use stockledger_core::ArtifactRenderer;
use stockledger_labels::{LabelConfig, QrPdfRenderer};

use crate::error::{DbError, DbResult};
use crate::inventory::Inventory;
use crate::migrations;

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings. Usually built from `[database]` in config.toml via
/// `StockConfig::db_config`.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file; created when missing.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,

    /// How long a caller waits for a pooled connection.
    pub connect_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Private single-connection database, dropped with the pool.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Owns the pool and hands out [`Inventory`] services over it.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(config.db_config()).await?;
/// let inventory = db.inventory_with(config.labels.clone());
/// let item = inventory.create_item(&RequestContext::new(), new_item).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the database and applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Off by default in SQLite; category RESTRICT and supplier
            // SET NULL depend on it.
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Applies pending migrations. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns an Inventory service using the default QR/PDF renderer.
    pub fn inventory(&self) -> Inventory {
        self.inventory_with(LabelConfig::default())
    }

    /// Returns an Inventory service rendering labels with `labels`.
    pub fn inventory_with(&self, labels: LabelConfig) -> Inventory {
        self.inventory_with_renderer(Arc::new(QrPdfRenderer::new(labels)))
    }

    /// Returns an Inventory service backed by a custom renderer.
    pub fn inventory_with_renderer(&self, renderer: Arc<dyn ArtifactRenderer>) -> Inventory {
        Inventory::new(self.clone(), renderer)
    }

    /// Closes the pool; later queries fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_file_database_is_created_and_reopened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested.db");

        let db = Database::new(DbConfig::new(&path).max_connections(2)).await.unwrap();
        assert!(path.exists());
        db.close().await;
        assert!(!db.health_check().await);

        let reopened = Database::new(DbConfig::new(&path)).await.unwrap();
        assert!(reopened.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .connect_timeout(Duration::from_secs(3));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(DbConfig::in_memory().max_connections, 1);
    }
}
