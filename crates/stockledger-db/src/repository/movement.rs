//! # Movement Repository
//!
//! Database operations for the movement ledger.
//!
//! ## Ledger Reads
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  entries_for_item()  → (movement_type, quantity) pairs, unordered      │
//! │                        input for ledger::balance_from_entries          │
//! │                                                                         │
//! │  list_for_item()     → full rows ordered by movement_date, insertion   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Executor, Sqlite};
use tracing::debug;

use crate::error::DbResult;
use stockledger_core::{Movement, MovementType};

/// Repository for movement database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementRepository;

impl MovementRepository {
    /// Appends a movement to the ledger.
    pub async fn insert<'e, E>(executor: E, movement: &Movement) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(
            id = %movement.id,
            item_id = %movement.item_id,
            movement_type = %movement.movement_type,
            quantity = movement.quantity,
            "Inserting movement"
        );

        sqlx::query(
            r#"
            INSERT INTO movements (
                id, item_id, category_id, quantity, movement_type, movement_date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.item_id)
        .bind(&movement.category_id)
        .bind(movement.quantity)
        .bind(movement.movement_type)
        .bind(movement.movement_date)
        .bind(movement.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn get<'e, E>(executor: E, id: &str) -> DbResult<Option<Movement>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let movement = sqlx::query_as::<_, Movement>(
            r#"
            SELECT id, item_id, category_id, quantity, movement_type, movement_date, created_at
            FROM movements
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(movement)
    }

    /// Lists an item's movements ordered by date, then insertion.
    pub async fn list_for_item<'e, E>(executor: E, item_id: &str) -> DbResult<Vec<Movement>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let movements = sqlx::query_as::<_, Movement>(
            r#"
            SELECT id, item_id, category_id, quantity, movement_type, movement_date, created_at
            FROM movements
            WHERE item_id = ?1
            ORDER BY movement_date, rowid
            "#,
        )
        .bind(item_id)
        .fetch_all(executor)
        .await?;

        Ok(movements)
    }

    /// Returns the type and quantity of every movement of an item.
    pub async fn entries_for_item<'e, E>(
        executor: E,
        item_id: &str,
    ) -> DbResult<Vec<(MovementType, i32)>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let entries = sqlx::query_as::<_, (MovementType, i32)>(
            "SELECT movement_type, quantity FROM movements WHERE item_id = ?1",
        )
        .bind(item_id)
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }

    pub async fn count_for_item<'e, E>(executor: E, item_id: &str) -> DbResult<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movements WHERE item_id = ?1")
            .bind(item_id)
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    /// Rewrites a movement row. Returns rows affected.
    pub async fn update<'e, E>(executor: E, movement: &Movement) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE movements SET
                item_id = ?2,
                category_id = ?3,
                quantity = ?4,
                movement_type = ?5,
                movement_date = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.item_id)
        .bind(&movement.category_id)
        .bind(movement.quantity)
        .bind(movement.movement_type)
        .bind(movement.movement_date)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(executor: E, id: &str) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM movements WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
