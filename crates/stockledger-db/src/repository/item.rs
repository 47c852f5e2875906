//! # Item Repository
//!
//! Database operations for items.
//!
//! ## Balance Cache
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  items.available_quantity is never adjusted by a delta. The Inventory  │
//! │  service re-aggregates the item's movements and writes the result with │
//! │  set_available_quantity() inside the same transaction.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Executor, Sqlite};
use tracing::debug;

use crate::error::DbResult;
use stockledger_core::Item;

/// Repository for item database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemRepository;

impl ItemRepository {
    /// Inserts a new item row, artifacts included.
    pub async fn insert<'e, E>(executor: E, item: &Item) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %item.id, name = %item.name, "Inserting item");

        sqlx::query(
            r#"
            INSERT INTO items (
                id, name, category_id, available_quantity, supplier_id,
                description, acquisition_date, location, monetary_value,
                market_reference, qr_image, qr_pdf, requested_quantity, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.category_id)
        .bind(item.available_quantity)
        .bind(&item.supplier_id)
        .bind(&item.description)
        .bind(item.acquisition_date)
        .bind(&item.location)
        .bind(item.monetary_value)
        .bind(&item.market_reference)
        .bind(item.qr_image.as_deref())
        .bind(item.qr_pdf.as_deref())
        .bind(item.requested_quantity)
        .bind(item.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Gets an item by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Item))` - Item found
    /// * `Ok(None)` - Item not found
    pub async fn get<'e, E>(executor: E, id: &str) -> DbResult<Option<Item>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT
                id, name, category_id, available_quantity, supplier_id,
                description, acquisition_date, location, monetary_value,
                market_reference, qr_image, qr_pdf, requested_quantity, created_at
            FROM items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(item)
    }

    /// Lists items by name, optionally restricted to one category.
    pub async fn list<'e, E>(executor: E, category_id: Option<&str>) -> DbResult<Vec<Item>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT
                id, name, category_id, available_quantity, supplier_id,
                description, acquisition_date, location, monetary_value,
                market_reference, qr_image, qr_pdf, requested_quantity, created_at
            FROM items
            WHERE ?1 IS NULL OR category_id = ?1
            ORDER BY name, rowid
            "#,
        )
        .bind(category_id)
        .fetch_all(executor)
        .await?;

        debug!(count = items.len(), ?category_id, "Listed items");
        Ok(items)
    }

    /// Writes every client-editable column plus the artifacts.
    ///
    /// `available_quantity` is left alone; see [`Self::set_available_quantity`].
    pub async fn update<'e, E>(executor: E, item: &Item) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE items SET
                name = ?2,
                category_id = ?3,
                supplier_id = ?4,
                description = ?5,
                acquisition_date = ?6,
                location = ?7,
                monetary_value = ?8,
                market_reference = ?9,
                qr_image = ?10,
                qr_pdf = ?11,
                requested_quantity = ?12
            WHERE id = ?1
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.category_id)
        .bind(&item.supplier_id)
        .bind(&item.description)
        .bind(item.acquisition_date)
        .bind(&item.location)
        .bind(item.monetary_value)
        .bind(&item.market_reference)
        .bind(item.qr_image.as_deref())
        .bind(item.qr_pdf.as_deref())
        .bind(item.requested_quantity)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Persists a freshly aggregated balance.
    pub async fn set_available_quantity<'e, E>(executor: E, id: &str, quantity: i32) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(item_id = %id, available = quantity, "Persisting balance");

        sqlx::query("UPDATE items SET available_quantity = ?2 WHERE id = ?1")
            .bind(id)
            .bind(quantity)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Opens the write side of the current transaction on the item row.
    ///
    /// SQLite upgrades a deferred transaction to a writer on its first write;
    /// issuing that write before any read keeps the balance read that follows
    /// from going stale. Returns `false` if the item does not exist.
    pub async fn claim<'e, E>(executor: E, id: &str) -> DbResult<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE items SET available_quantity = available_quantity WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes an item row. Remaining movements make this fail with a
    /// foreign key violation.
    pub async fn delete<'e, E>(executor: E, id: &str) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
