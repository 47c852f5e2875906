//! # Category Repository
//!
//! Database operations for categories.

use sqlx::{Executor, Sqlite};
use tracing::debug;

use crate::error::DbResult;
use stockledger_core::Category;

/// Repository for category database operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryRepository;

impl CategoryRepository {
    /// Inserts a new category row.
    pub async fn insert<'e, E>(executor: E, category: &Category) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %category.id, name = %category.name, "Inserting category");

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Gets a category by its ID.
    pub async fn get<'e, E>(executor: E, id: &str) -> DbResult<Option<Category>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, created_at
            FROM categories
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(category)
    }

    /// Lists all categories by name.
    pub async fn list<'e, E>(executor: E) -> DbResult<Vec<Category>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, created_at
            FROM categories
            ORDER BY name, rowid
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(categories)
    }

    /// Writes the mutable fields of `category`. Returns rows affected.
    pub async fn update<'e, E>(executor: E, category: &Category) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE categories SET name = ?2, description = ?3 WHERE id = ?1")
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.description)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a category. Items still referencing it make this fail with a
    /// foreign key violation.
    pub async fn delete<'e, E>(executor: E, id: &str) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
