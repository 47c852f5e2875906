//! # Database Error Types
//!
//! Error types for database operations and the Inventory service.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)      CoreError        RenderError           │
//! │       │                              │                 │                │
//! │       ▼                              ▼                 ▼                │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Transaction dropped → rolled back, nothing persisted                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use stockledger_core::{CoreError, RenderError, ValidationError};
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and ledger rule violations, and provide
/// additional context for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows
    /// - ID doesn't exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a non-existent category or supplier
    /// - Deleting a category that still has items
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read, parsed or written.
    #[error("Failed to load configuration: {0}")]
    ConfigLoadFailed(String),

    /// A ledger rule or input validation rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// QR/PDF generation failed; the item write was rolled back.
    #[error("Label rendering failed: {0}")]
    Render(#[from] RenderError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns true for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // FK constraint: "FOREIGN KEY constraint failed"
                // CHECK constraints fall through to QueryFailed
                if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for DbError {
    fn from(err: toml::de::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for DbError {
    fn from(err: toml::ser::Error) -> Self {
        DbError::ConfigLoadFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[test]
    fn test_validation_lifts_into_core() {
        let err: DbError = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
        assert_eq!(err.to_string(), "Validation error: quantity must be positive");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_constraint_failures_are_classified() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err: DbError = sqlx::query(
            "INSERT INTO items (id, name, category_id, created_at) VALUES ('i1', 'Drill', 'nope', '2024-01-01')",
        )
        .execute(db.pool())
        .await
        .unwrap_err()
        .into();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        let err: DbError = sqlx::query(
            "INSERT INTO categories (id, name, created_at) VALUES ('c1', '', '2024-01-01')",
        )
        .execute(db.pool())
        .await
        .unwrap_err()
        .into();
        assert!(matches!(err, DbError::QueryFailed(ref msg) if msg.contains("CHECK constraint failed")));
    }
}
