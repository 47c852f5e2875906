//! # Supplier Repository
//!
//! Database operations for suppliers. Deleting a supplier detaches its items
//! (`ON DELETE SET NULL`).

use sqlx::{Executor, Sqlite};
use tracing::debug;

use crate::error::DbResult;
use stockledger_core::Supplier;

#[derive(Debug, Clone, Copy, Default)]
pub struct SupplierRepository;

impl SupplierRepository {
    pub async fn insert<'e, E>(executor: E, supplier: &Supplier) -> DbResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!(id = %supplier.id, name = %supplier.name, "Inserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, name, contact_name, contact_email, contact_phone, address, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.contact_email)
        .bind(&supplier.contact_phone)
        .bind(&supplier.address)
        .bind(supplier.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn get<'e, E>(executor: E, id: &str) -> DbResult<Option<Supplier>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, name, contact_name, contact_email, contact_phone, address, created_at
            FROM suppliers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(supplier)
    }

    pub async fn list<'e, E>(executor: E) -> DbResult<Vec<Supplier>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, name, contact_name, contact_email, contact_phone, address, created_at
            FROM suppliers
            ORDER BY name, rowid
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(suppliers)
    }

    pub async fn update<'e, E>(executor: E, supplier: &Supplier) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE suppliers
            SET name = ?2, contact_name = ?3, contact_email = ?4, contact_phone = ?5, address = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.contact_email)
        .bind(&supplier.contact_phone)
        .bind(&supplier.address)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete<'e, E>(executor: E, id: &str) -> DbResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
