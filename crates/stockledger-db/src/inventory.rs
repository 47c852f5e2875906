//! # Inventory Service
//!
//! Transactional operations over categories, suppliers, items and the
//! movement ledger.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    record_movement(ctx, input)                          │
//! │                                                                         │
//! │  validate input (quantity > 0, ids)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ItemLocks::lock(item_id)          ← same-item writers queue here      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │  ├── ItemRepository::claim        ← first statement is a write         │
//! │  ├── balance = Σ movements        ← full re-aggregation                │
//! │  ├── ledger::ensure_available     ← outbound / loaned only             │
//! │  ├── MovementRepository::insert                                        │
//! │  └── items.available_quantity = Σ movements                            │
//! │  COMMIT                            (any error: dropped → rolled back)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  re-read row from the pool                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Item create/update follow the same shape; they may add one compensating
//! movement (no availability check) and re-render label artifacts.
//!
//! Every mutation takes a [`RequestContext`] and runs inside an `inventory`
//! span carrying its request id, actor and operation name.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use stockledger_core::ledger::{self, compensating_movement};
use stockledger_core::validation;
use stockledger_core::{
    ArtifactRenderer, Category, CategoryUpdate, CoreError, Item, ItemUpdate, Movement,
    MovementUpdate, NewCategory, NewItem, NewMovement, NewSupplier, Supplier,
    SupplierUpdate,
};

use crate::context::RequestContext;
use crate::error::{DbError, DbResult};
use crate::locks::ItemLocks;
use crate::pool::Database;
use crate::repository::{
    CategoryRepository, ItemRepository, MovementRepository, SupplierRepository,
};

// =============================================================================
// Ledger Helpers
// =============================================================================

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Re-aggregates an item's movements without persisting.
async fn current_balance(conn: &mut SqliteConnection, item_id: &str) -> DbResult<i32> {
    let entries = MovementRepository::entries_for_item(&mut *conn, item_id).await?;
    Ok(ledger::balance_from_entries(entries)?)
}

/// Re-aggregates an item's movements and stores the result on the item.
async fn refresh_balance(conn: &mut SqliteConnection, item_id: &str) -> DbResult<i32> {
    let available = current_balance(&mut *conn, item_id).await?;
    ItemRepository::set_available_quantity(&mut *conn, item_id, available).await?;
    Ok(available)
}

/// Appends the movement that brings `available` to `requested`, if any.
async fn compensate(
    conn: &mut SqliteConnection,
    item: &Item,
    available: i32,
    requested: i32,
) -> DbResult<Option<Movement>> {
    let Some(comp) = compensating_movement(available, requested)? else {
        return Ok(None);
    };

    let movement = Movement {
        id: new_id(),
        item_id: item.id.clone(),
        category_id: item.category_id.clone(),
        quantity: comp.quantity,
        movement_type: comp.movement_type,
        movement_date: today(),
        created_at: Utc::now(),
    };
    MovementRepository::insert(&mut *conn, &movement).await?;

    debug!(
        item_id = %item.id,
        available,
        requested,
        movement_type = %comp.movement_type,
        quantity = comp.quantity,
        "Compensating movement recorded"
    );
    Ok(Some(movement))
}

async fn commit(tx: sqlx::Transaction<'_, sqlx::Sqlite>) -> DbResult<()> {
    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

// =============================================================================
// Inventory
// =============================================================================

/// The inventory service.
///
/// Cheap to clone; clones share the pool, renderer and item locks.
#[derive(Clone)]
pub struct Inventory {
    db: Database,
    renderer: Arc<dyn ArtifactRenderer>,
    locks: ItemLocks,
}

impl std::fmt::Debug for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inventory")
            .field("db", &self.db)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl Inventory {
    pub fn new(db: Database, renderer: Arc<dyn ArtifactRenderer>) -> Self {
        Inventory {
            db,
            renderer,
            locks: ItemLocks::new(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Categories
    // =========================================================================

    #[instrument(
        name = "inventory",
        skip_all,
        fields(request_id = %ctx.request_id, actor = ?ctx.actor, op = "create_category")
    )]
    pub async fn create_category(
        &self,
        ctx: &RequestContext,
        input: NewCategory,
    ) -> DbResult<Category> {
        validation::validate_new_category(&input)?;

        let category = Category {
            id: new_id(),
            name: input.name.trim().to_string(),
            description: input.description,
            created_at: Utc::now(),
        };

        let mut tx = self.db.pool().begin().await?;
        CategoryRepository::insert(&mut *tx, &category).await?;
        commit(tx).await?;

        info!(category_id = %category.id, "Category created");
        self.get_category(&category.id).await
    }

    #[instrument(
        name = "inventory",
        skip_all,
        fields(request_id = %ctx.request_id, actor = ?ctx.actor, op = "update_category")
    )]
    pub async fn update_category(
        &self,
        ctx: &RequestContext,
        id: &str,
        update: CategoryUpdate,
    ) -> DbResult<Category> {
        validation::validate_category_update(&update)?;

        let mut category = self.get_category(id).await?;
        if let Some(name) = update.name {
            category.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            category.description = description;
        }

        let mut tx = self.db.pool().begin().await?;
        if CategoryRepository::update(&mut *tx, &category).await? == 0 {
            return Err(DbError::not_found("Category", id));
        }
        commit(tx).await?;

        info!(category_id = %id, "Category updated");
        self.get_category(id).await
    }

    /// Deletes a category. Fails with `ForeignKeyViolation` while items or
    /// movements still reference it.
    #[instrument(
        name = "inventory",
        skip_all,
        fields(request_id = %ctx.request_id, actor = ?ctx.actor, op = "delete_category")
    )]
    pub async fn delete_category(&self, ctx: &RequestContext, id: &str) -> DbResult<()> {
        let mut tx = self.db.pool().begin().await?;
        if CategoryRepository::delete(&mut *tx, id).await? == 0 {
            return Err(DbError::not_found("Category", id));
        }
        commit(tx).await?;

        info!(category_id = %id, "Category deleted");
        Ok(())
    }

    pub async fn get_category(&self, id: &str) -> DbResult<Category> {
        CategoryRepository::get(self.db.pool(), id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        CategoryRepository::list(self.db.pool()).await
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    #[instrument(
        name = "inventory",
        skip_all,
        fields(request_id = %ctx.request_id, actor = ?ctx.actor, op = "create_supplier")
    )]
    pub async fn create_supplier(
        &self,
        ctx: &RequestContext,
        input: NewSupplier,
    ) -> DbResult<Supplier> {
        validation::validate_new_supplier(&input)?;

        let supplier = Supplier {
            id: new_id(),
            name: input.name.trim().to_string(),
            contact_name: input.contact_name,
            contact_email: input.contact_email.map(|e| e.trim().to_string()),
            contact_phone: input.contact_phone,
            address: input.address,
            created_at: Utc::now(),
        };

        let mut tx = self.db.pool().begin().await?;
        SupplierRepository::insert(&mut *tx, &supplier).await?;
        commit(tx).await?;

        info!(supplier_id = %supplier.id, "Supplier created");
        self.get_supplier(&supplier.id).await
    }

    #[instrument(
        name = "inventory",
        skip_all,
        fields(request_id = %ctx.request_id, actor = ?ctx.actor, op = "update_supplier")
    )]
    pub async fn update_supplier(
        &self,
        ctx: &RequestContext,
        id: &str,
        update: SupplierUpdate,
    ) -> DbResult<Supplier> {
        validation::validate_supplier_update(&update)?;

        let mut supplier = self.get_supplier(id).await?;
        if let Some(name) = update.name {
            supplier.name = name.trim().to_string();
        }
        if let Some(contact_name) = update.contact_name {
            supplier.contact_name = contact_name;
        }
        if let Some(contact_email) = update.contact_email {
            supplier.contact_email = contact_email.map(|e| e.trim().to_string());
        }
        if let Some(contact_phone) = update.contact_phone {
            supplier.contact_phone = contact_phone;
        }
        if let Some(address) = update.address {
            supplier.address = address;
        }

        let mut tx = self.db.pool().begin().await?;
        if SupplierRepository::update(&mut *tx, &supplier).await? == 0 {
            return Err(DbError::not_found("Supplier", id));
        }
        commit(tx).await?;

        info!(supplier_id = %id, "Supplier updated");
        self.get_supplier(id).await
    }

    /// Deletes a supplier; items that referenced it keep existing with no
    /// supplier.
    #[instrument(
        name = "inventory",
        skip_all,
        fields(request_id = %ctx.request_id, actor = ?ctx.actor, op = "delete_supplier")
    )]
    pub async fn delete_supplier(&self, ctx: &RequestContext, id: &str) -> DbResult<()> {
        let mut tx = self.db.pool().begin().await?;
        if SupplierRepository::delete(&mut *tx, id).await? == 0 {
            return Err(DbError::not_found("Supplier", id));
        }
        commit(tx).await?;

        info!(supplier_id = %id, "Supplier deleted");
        Ok(())
    }

    pub async fn get_supplier(&self, id: &str) -> DbResult<Supplier> {
        SupplierRepository::get(self.db.pool(), id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn list_suppliers(&self) -> DbResult<Vec<Supplier>> {
        SupplierRepository::list(self.db.pool()).await
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Checks that the referenced category and supplier exist.
    async fn ensure_references(&self, category_id: &str, supplier_id: Option<&str>) -> DbResult<()> {
        self.get_category(category_id).await?;
        if let Some(supplier_id) = supplier_id {
            self.get_supplier(supplier_id).await?;
        }
        Ok(())
    }

    /// Creates an item with rendered label artifacts.
    ///
    /// A non-zero `requested_quantity` becomes one compensating movement
    /// (`inbound` if positive, `outbound` if negative) dated today. That
    /// movement is not checked against availability, so a negative request
    /// leaves the item with a negative balance.
    #[instrument(
        name = "inventory",
        skip_all,
        fields(request_id = %ctx.request_id, actor = ?ctx.actor, op = "create_item")
    )]
    pub async fn create_item(&self, ctx: &RequestContext, input: NewItem) -> DbResult<Item> {
        validation::validate_new_item(&input)?;
        self.ensure_references(&input.category_id, input.supplier_id.as_deref())
            .await?;

        let mut item = Item {
            id: new_id(),
            name: input.name.trim().to_string(),
            category_id: input.category_id,
            available_quantity: 0,
            supplier_id: input.supplier_id,
            description: input.description,
            acquisition_date: input.acquisition_date,
            location: input.location,
            monetary_value: input.monetary_value,
            market_reference: input.market_reference,
            qr_image: None,
            qr_pdf: None,
            requested_quantity: input.requested_quantity,
            created_at: Utc::now(),
        };

        let artifacts = self.renderer.render(&item.label_fields())?;
        item.qr_image = Some(artifacts.qr_png);
        item.qr_pdf = Some(artifacts.pdf);

        let mut tx = self.db.pool().begin().await?;
        ItemRepository::insert(&mut *tx, &item).await?;
        compensate(&mut *tx, &item, 0, item.requested_quantity).await?;
        let available = refresh_balance(&mut *tx, &item.id).await?;
        commit(tx).await?;

        info!(item_id = %item.id, available, "Item created");
        self.get_item(&item.id).await
    }

    /// Applies a partial update to an item.
    ///
    /// ## Steps (one transaction, item lock held)
    /// 1. Label artifacts are re-rendered only if name, acquisition date,
    ///    market reference or location is present and differs.
    /// 2. If `requested_quantity` is present and differs from the current
    ///    balance, one compensating movement covers the difference.
    /// 3. The balance is re-aggregated.
    #[instrument(
        name = "inventory",
        skip_all,
        fields(request_id = %ctx.request_id, actor = ?ctx.actor, op = "update_item")
    )]
    pub async fn update_item(
        &self,
        ctx: &RequestContext,
        id: &str,
        update: ItemUpdate,
    ) -> DbResult<Item> {
        validation::validate_item_update(&update)?;
        if let Some(category_id) = &update.category_id {
            self.get_category(category_id).await?;
        }
        if let Some(Some(supplier_id)) = &update.supplier_id {
            self.get_supplier(supplier_id).await?;
        }

        let _guard = self.locks.lock(id).await;
        let mut tx = self.db.pool().begin().await?;

        if !ItemRepository::claim(&mut *tx, id).await? {
            return Err(DbError::not_found("Item", id));
        }
        let current = ItemRepository::get(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))?;

        let relabel = update.changes_label(&current);
        let mut item = current;
        update.apply_to(&mut item);

        if relabel {
            let artifacts = self.renderer.render(&item.label_fields())?;
            item.qr_image = Some(artifacts.qr_png);
            item.qr_pdf = Some(artifacts.pdf);
            debug!(item_id = %id, "Label artifacts regenerated");
        }

        ItemRepository::update(&mut *tx, &item).await?;

        if let Some(requested) = update.requested_quantity {
            let available = current_balance(&mut *tx, id).await?;
            compensate(&mut *tx, &item, available, requested).await?;
        }

        let available = refresh_balance(&mut *tx, id).await?;
        commit(tx).await?;

        info!(item_id = %id, available, relabel, "Item updated");
        self.get_item(id).await
    }

    /// Deletes an item that has no movements.
    ///
    /// Items with ledger history are rejected with
    /// `CoreError::ItemHasMovements`.
    #[instrument(
        name = "inventory",
        skip_all,
        fields(request_id = %ctx.request_id, actor = ?ctx.actor, op = "delete_item")
    )]
    pub async fn delete_item(&self, ctx: &RequestContext, id: &str) -> DbResult<()> {
        let _guard = self.locks.lock(id).await;
        let mut tx = self.db.pool().begin().await?;

        if !ItemRepository::claim(&mut *tx, id).await? {
            return Err(DbError::not_found("Item", id));
        }

        let movements = MovementRepository::count_for_item(&mut *tx, id).await?;
        if movements > 0 {
            return Err(CoreError::ItemHasMovements {
                item_id: id.to_string(),
                movements,
            }
            .into());
        }

        ItemRepository::delete(&mut *tx, id).await?;
        commit(tx).await?;

        info!(item_id = %id, "Item deleted");
        Ok(())
    }

    pub async fn get_item(&self, id: &str) -> DbResult<Item> {
        ItemRepository::get(self.db.pool(), id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))
    }

    /// Lists items by name, optionally only those in `category_id`.
    pub async fn list_items(&self, category_id: Option<&str>) -> DbResult<Vec<Item>> {
        ItemRepository::list(self.db.pool(), category_id).await
    }

    // =========================================================================
    // Movements
    // =========================================================================

    /// Records a movement directly against the ledger.
    ///
    /// `outbound` and `loaned` quantities must not exceed the balance
    /// re-aggregated at validation time.
    #[instrument(
        name = "inventory",
        skip_all,
        fields(request_id = %ctx.request_id, actor = ?ctx.actor, op = "record_movement")
    )]
    pub async fn record_movement(
        &self,
        ctx: &RequestContext,
        input: NewMovement,
    ) -> DbResult<Movement> {
        validation::validate_new_movement(&input)?;

        let _guard = self.locks.lock(&input.item_id).await;
        let mut tx = self.db.pool().begin().await?;

        if !ItemRepository::claim(&mut *tx, &input.item_id).await? {
            return Err(DbError::not_found("Item", &input.item_id));
        }
        let item = ItemRepository::get(&mut *tx, &input.item_id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", &input.item_id))?;

        let available = current_balance(&mut *tx, &item.id).await?;
        ledger::ensure_available(&item.id, available, input.movement_type, input.quantity)?;

        let movement = Movement {
            id: new_id(),
            item_id: item.id.clone(),
            category_id: item.category_id.clone(),
            quantity: input.quantity,
            movement_type: input.movement_type,
            movement_date: input.movement_date.unwrap_or_else(today),
            created_at: Utc::now(),
        };
        MovementRepository::insert(&mut *tx, &movement).await?;

        let available = refresh_balance(&mut *tx, &item.id).await?;
        commit(tx).await?;

        info!(
            movement_id = %movement.id,
            item_id = %item.id,
            movement_type = %movement.movement_type,
            quantity = movement.quantity,
            available,
            "Movement recorded"
        );
        self.get_movement(&movement.id).await
    }

    /// Applies a partial update to a movement.
    ///
    /// When item, quantity or type changes and the resulting movement is
    /// `outbound`/`loaned`, its quantity is checked against the target
    /// item's current balance, which still includes this movement's present
    /// effect. Both the old and the new item are re-aggregated.
    #[instrument(
        name = "inventory",
        skip_all,
        fields(request_id = %ctx.request_id, actor = ?ctx.actor, op = "update_movement")
    )]
    pub async fn update_movement(
        &self,
        ctx: &RequestContext,
        id: &str,
        update: MovementUpdate,
    ) -> DbResult<Movement> {
        validation::validate_movement_update(&update)?;

        let existing = self.get_movement(id).await?;
        let target_id = update
            .item_id
            .clone()
            .unwrap_or_else(|| existing.item_id.clone());

        let _guards = self
            .locks
            .lock_all(&[existing.item_id.as_str(), target_id.as_str()])
            .await;
        let mut tx = self.db.pool().begin().await?;

        if !ItemRepository::claim(&mut *tx, &target_id).await? {
            return Err(DbError::not_found("Item", &target_id));
        }
        let current = MovementRepository::get(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Movement", id))?;
        if current.item_id != existing.item_id {
            return Err(DbError::TransactionFailed(format!(
                "movement {id} was moved to another item concurrently"
            )));
        }

        let mut merged = update.merged(&current);
        if merged.item_id != current.item_id {
            let target = ItemRepository::get(&mut *tx, &merged.item_id)
                .await?
                .ok_or_else(|| DbError::not_found("Item", &merged.item_id))?;
            merged.category_id = target.category_id;
        }

        if update.affects_balance(&current) && merged.movement_type.consumes_stock() {
            let available = current_balance(&mut *tx, &merged.item_id).await?;
            ledger::ensure_available(
                &merged.item_id,
                available,
                merged.movement_type,
                merged.quantity,
            )?;
        }

        MovementRepository::update(&mut *tx, &merged).await?;
        let available = refresh_balance(&mut *tx, &merged.item_id).await?;
        if merged.item_id != current.item_id {
            refresh_balance(&mut *tx, &current.item_id).await?;
        }
        commit(tx).await?;

        info!(
            movement_id = %id,
            item_id = %merged.item_id,
            movement_type = %merged.movement_type,
            quantity = merged.quantity,
            available,
            "Movement updated"
        );
        self.get_movement(id).await
    }

    /// Removes a movement and re-aggregates its item. No availability check
    /// applies, so the balance may go negative.
    #[instrument(
        name = "inventory",
        skip_all,
        fields(request_id = %ctx.request_id, actor = ?ctx.actor, op = "delete_movement")
    )]
    pub async fn delete_movement(&self, ctx: &RequestContext, id: &str) -> DbResult<()> {
        let existing = self.get_movement(id).await?;

        let _guard = self.locks.lock(&existing.item_id).await;
        let mut tx = self.db.pool().begin().await?;

        ItemRepository::claim(&mut *tx, &existing.item_id).await?;
        if MovementRepository::delete(&mut *tx, id).await? == 0 {
            return Err(DbError::not_found("Movement", id));
        }
        let available = refresh_balance(&mut *tx, &existing.item_id).await?;
        commit(tx).await?;

        info!(movement_id = %id, item_id = %existing.item_id, available, "Movement deleted");
        Ok(())
    }

    pub async fn get_movement(&self, id: &str) -> DbResult<Movement> {
        MovementRepository::get(self.db.pool(), id)
            .await?
            .ok_or_else(|| DbError::not_found("Movement", id))
    }

    /// Lists an item's movements ordered by date, then insertion.
    pub async fn list_movements(&self, item_id: &str) -> DbResult<Vec<Movement>> {
        self.get_item(item_id).await?;
        MovementRepository::list_for_item(self.db.pool(), item_id).await
    }

    /// Re-aggregates the ledger of an item without writing anything.
    pub async fn ledger_balance(&self, item_id: &str) -> DbResult<i32> {
        let movements = self.list_movements(item_id).await?;
        Ok(ledger::compute_balance(&movements)?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use stockledger_core::{Artifacts, LabelFields, MovementType, RenderError};

    fn ctx() -> RequestContext {
        RequestContext::with_actor("test")
    }

    async fn setup() -> (Inventory, Category) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let inventory = db.inventory();
        let category = inventory
            .create_category(
                &ctx(),
                NewCategory {
                    name: "Tools".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        (inventory, category)
    }

    fn new_item(category: &Category, name: &str, requested: i32) -> NewItem {
        NewItem {
            name: name.to_string(),
            category_id: category.id.clone(),
            location: Some("Shelf A".to_string()),
            market_reference: Some("MR-1".to_string()),
            requested_quantity: requested,
            ..Default::default()
        }
    }

    fn movement(item: &Item, movement_type: MovementType, quantity: i32) -> NewMovement {
        NewMovement {
            item_id: item.id.clone(),
            quantity,
            movement_type,
            movement_date: None,
        }
    }

    fn decode_qr(png: &[u8]) -> String {
        let img = image::load_from_memory(png).unwrap().to_luma8();
        let (w, h) = img.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(w as usize, h as usize, |x, y| {
                img.get_pixel(x as u32, y as u32).0[0]
            });
        let grids = prepared.detect_grids();
        grids[0].decode().unwrap().1
    }

    /// Renderer that always fails.
    struct BrokenRenderer;

    impl ArtifactRenderer for BrokenRenderer {
        fn render(&self, _fields: &LabelFields) -> Result<Artifacts, RenderError> {
            Err(RenderError::Encode("payload rejected".to_string()))
        }
    }

    // -------------------------------------------------------------------------
    // Balance and compensation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_with_positive_request_adds_one_inbound() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Drill", 5)).await.unwrap();

        assert_eq!(item.available_quantity, 5);
        assert_eq!(item.requested_quantity, 5);

        let movements = inv.list_movements(&item.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Inbound);
        assert_eq!(movements[0].quantity, 5);
        assert_eq!(movements[0].category_id, cat.id);
        assert_eq!(movements[0].movement_date, today());
    }

    #[tokio::test]
    async fn test_create_with_negative_request_goes_negative() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Cable", -3)).await.unwrap();

        assert_eq!(item.available_quantity, -3);
        let movements = inv.list_movements(&item.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Outbound);
        assert_eq!(movements[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_create_with_zero_request_has_no_movements() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Tape", 0)).await.unwrap();

        assert_eq!(item.available_quantity, 0);
        assert!(inv.list_movements(&item.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outbound_over_balance_is_rejected() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Saw", 10)).await.unwrap();

        let err = inv
            .record_movement(&ctx(), movement(&item, MovementType::Outbound, 11))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientQuantity { available: 10, requested: 11, .. })
        ));

        let item = inv.get_item(&item.id).await.unwrap();
        assert_eq!(item.available_quantity, 10);
        assert_eq!(inv.list_movements(&item.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_loan_and_return_cycle() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Ladder", 2)).await.unwrap();

        inv.record_movement(&ctx(), movement(&item, MovementType::Loaned, 2))
            .await
            .unwrap();
        assert_eq!(inv.get_item(&item.id).await.unwrap().available_quantity, 0);

        let err = inv
            .record_movement(&ctx(), movement(&item, MovementType::Loaned, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientQuantity { .. })));

        inv.record_movement(&ctx(), movement(&item, MovementType::Returned, 2))
            .await
            .unwrap();
        assert_eq!(inv.get_item(&item.id).await.unwrap().available_quantity, 2);
    }

    #[tokio::test]
    async fn test_update_request_compensates_difference() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Hammer", 10)).await.unwrap();

        let updated = inv
            .update_item(
                &ctx(),
                &item.id,
                ItemUpdate {
                    requested_quantity: Some(7),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.available_quantity, 7);
        assert_eq!(updated.requested_quantity, 7);

        let movements = inv.list_movements(&item.id).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[1].movement_type, MovementType::Outbound);
        assert_eq!(movements[1].quantity, 3);
    }

    #[tokio::test]
    async fn test_update_request_is_measured_against_ledger_balance() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Level", 4)).await.unwrap();
        inv.record_movement(&ctx(), movement(&item, MovementType::Loaned, 3))
            .await
            .unwrap();

        // Balance is 1; the stored requested_quantity (4) is irrelevant.
        let updated = inv
            .update_item(
                &ctx(),
                &item.id,
                ItemUpdate {
                    requested_quantity: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.available_quantity, 4);
        let last = inv.list_movements(&item.id).await.unwrap().pop().unwrap();
        assert_eq!(last.movement_type, MovementType::Inbound);
        assert_eq!(last.quantity, 3);
    }

    #[tokio::test]
    async fn test_update_without_request_or_equal_request_adds_nothing() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Clamp", 6)).await.unwrap();

        inv.update_item(
            &ctx(),
            &item.id,
            ItemUpdate {
                description: Some(Some("spare".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        inv.update_item(
            &ctx(),
            &item.id,
            ItemUpdate {
                requested_quantity: Some(6),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(inv.list_movements(&item.id).await.unwrap().len(), 1);
        assert_eq!(inv.get_item(&item.id).await.unwrap().available_quantity, 6);
    }

    #[tokio::test]
    async fn test_request_too_far_from_balance_is_rejected() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Ratchet", -10)).await.unwrap();

        let err = inv
            .update_item(
                &ctx(),
                &item.id,
                ItemUpdate {
                    requested_quantity: Some(i32::MAX),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::QuantityOverflow { value }) if value == i64::from(i32::MAX) + 10
        ));

        let unchanged = inv.get_item(&item.id).await.unwrap();
        assert_eq!(unchanged.available_quantity, -10);
        assert_eq!(unchanged.requested_quantity, -10);
        assert_eq!(inv.list_movements(&item.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cached_balance_matches_ledger_after_mixed_operations() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Jack", 20)).await.unwrap();

        inv.record_movement(&ctx(), movement(&item, MovementType::Outbound, 3))
            .await
            .unwrap();
        let loan = inv
            .record_movement(&ctx(), movement(&item, MovementType::Loaned, 5))
            .await
            .unwrap();
        inv.record_movement(&ctx(), movement(&item, MovementType::Returned, 2))
            .await
            .unwrap();
        inv.update_item(
            &ctx(),
            &item.id,
            ItemUpdate {
                requested_quantity: Some(9),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        inv.update_movement(
            &ctx(),
            &loan.id,
            MovementUpdate {
                quantity: Some(4),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let movements = inv.list_movements(&item.id).await.unwrap();
        let expected: i64 = movements.iter().map(Movement::signed_quantity).sum();
        let stored = inv.get_item(&item.id).await.unwrap().available_quantity;

        assert_eq!(i64::from(stored), expected);
        assert_eq!(inv.ledger_balance(&item.id).await.unwrap(), stored);
        assert_eq!(stored, 10);
    }

    // -------------------------------------------------------------------------
    // Movement validation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_non_positive_quantity_is_rejected() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Vise", 1)).await.unwrap();

        let err = inv
            .record_movement(&ctx(), movement(&item, MovementType::Inbound, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_movement_for_unknown_item_is_not_found() {
        let (inv, _cat) = setup().await;
        let err = inv
            .record_movement(
                &ctx(),
                NewMovement {
                    item_id: Uuid::new_v4().to_string(),
                    quantity: 1,
                    movement_type: MovementType::Inbound,
                    movement_date: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Item"));
    }

    #[tokio::test]
    async fn test_explicit_movement_date_is_kept() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Chisel", 0)).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2021, 3, 14).unwrap();

        let recorded = inv
            .record_movement(
                &ctx(),
                NewMovement {
                    movement_date: Some(date),
                    ..movement(&item, MovementType::Inbound, 2)
                },
            )
            .await
            .unwrap();
        assert_eq!(recorded.movement_date, date);
    }

    #[tokio::test]
    async fn test_flipping_inbound_to_outbound_revalidates() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Wrench", 0)).await.unwrap();

        let inbound = inv
            .record_movement(&ctx(), movement(&item, MovementType::Inbound, 4))
            .await
            .unwrap();
        inv.record_movement(&ctx(), movement(&item, MovementType::Outbound, 2))
            .await
            .unwrap();

        // Balance is 2; turning the inbound 4 into an outbound 4 overdraws.
        let err = inv
            .update_movement(
                &ctx(),
                &inbound.id,
                MovementUpdate {
                    movement_type: Some(MovementType::Outbound),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientQuantity { available: 2, requested: 4, .. })
        ));

        let unchanged = inv.get_movement(&inbound.id).await.unwrap();
        assert_eq!(unchanged.movement_type, MovementType::Inbound);
        assert_eq!(inv.get_item(&item.id).await.unwrap().available_quantity, 2);
    }

    #[tokio::test]
    async fn test_date_only_movement_update_skips_availability() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Pliers", -1)).await.unwrap();
        let outbound = inv.list_movements(&item.id).await.unwrap().remove(0);

        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let updated = inv
            .update_movement(
                &ctx(),
                &outbound.id,
                MovementUpdate {
                    movement_date: Some(date),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.movement_date, date);
        assert_eq!(inv.get_item(&item.id).await.unwrap().available_quantity, -1);
    }

    #[tokio::test]
    async fn test_moving_a_movement_between_items_refreshes_both() {
        let (inv, cat) = setup().await;
        let other_cat = inv
            .create_category(
                &ctx(),
                NewCategory {
                    name: "Garden".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        let a = inv.create_item(&ctx(), new_item(&cat, "Rake A", 0)).await.unwrap();
        let b = inv.create_item(&ctx(), new_item(&other_cat, "Rake B", 0)).await.unwrap();

        let m = inv
            .record_movement(&ctx(), movement(&a, MovementType::Inbound, 5))
            .await
            .unwrap();
        let moved = inv
            .update_movement(
                &ctx(),
                &m.id,
                MovementUpdate {
                    item_id: Some(b.id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.item_id, b.id);
        assert_eq!(moved.category_id, other_cat.id);
        assert_eq!(inv.get_item(&a.id).await.unwrap().available_quantity, 0);
        assert_eq!(inv.get_item(&b.id).await.unwrap().available_quantity, 5);
    }

    #[tokio::test]
    async fn test_delete_movement_recomputes_without_check() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Torch", 0)).await.unwrap();
        let inbound = inv
            .record_movement(&ctx(), movement(&item, MovementType::Inbound, 3))
            .await
            .unwrap();
        inv.record_movement(&ctx(), movement(&item, MovementType::Outbound, 3))
            .await
            .unwrap();

        inv.delete_movement(&ctx(), &inbound.id).await.unwrap();

        assert_eq!(inv.get_item(&item.id).await.unwrap().available_quantity, -3);
        assert!(inv.get_movement(&inbound.id).await.unwrap_err().is_not_found());
    }

    // -------------------------------------------------------------------------
    // Labels
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_created_item_carries_decodable_label() {
        let (inv, cat) = setup().await;
        let item = inv
            .create_item(
                &ctx(),
                NewItem {
                    acquisition_date: NaiveDate::from_ymd_opt(2022, 5, 17),
                    ..new_item(&cat, "Projector", 1)
                },
            )
            .await
            .unwrap();

        let png = item.qr_image.as_deref().unwrap();
        assert_eq!(
            decode_qr(png),
            "Name: Projector\nYear: 2022-05-17\nMarket reference: MR-1\nLocation: Shelf A"
        );
        assert!(item.qr_pdf.as_deref().unwrap().starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_label_regenerates_only_on_label_change() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Scanner", 0)).await.unwrap();

        let same = inv
            .update_item(
                &ctx(),
                &item.id,
                ItemUpdate {
                    monetary_value: Some(99.5),
                    location: Some(Some("Shelf A".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.qr_image, item.qr_image);
        assert_eq!(same.qr_pdf, item.qr_pdf);
        assert_eq!(same.monetary_value, 99.5);

        let moved = inv
            .update_item(
                &ctx(),
                &item.id,
                ItemUpdate {
                    location: Some(Some("Lab 3".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_ne!(moved.qr_image, item.qr_image);
        assert!(decode_qr(moved.qr_image.as_deref().unwrap()).ends_with("Location: Lab 3"));
    }

    #[tokio::test]
    async fn test_render_failure_rolls_back() {
        let (inv, cat) = setup().await;
        let item = inv.create_item(&ctx(), new_item(&cat, "Router", 2)).await.unwrap();

        let broken = inv
            .database()
            .inventory_with_renderer(Arc::new(BrokenRenderer));

        let err = broken
            .create_item(&ctx(), new_item(&cat, "Switch", 4))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Render(RenderError::Encode(_))));
        assert_eq!(inv.list_items(None).await.unwrap().len(), 1);

        let err = broken
            .update_item(
                &ctx(),
                &item.id,
                ItemUpdate {
                    name: Some("Router v2".to_string()),
                    requested_quantity: Some(8),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Render(_)));

        let unchanged = inv.get_item(&item.id).await.unwrap();
        assert_eq!(unchanged.name, "Router");
        assert_eq!(unchanged.available_quantity, 2);
        assert_eq!(inv.list_movements(&item.id).await.unwrap().len(), 1);
    }

    // -------------------------------------------------------------------------
    // Leaf entities and deletion policy
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_item_with_movements_cannot_be_deleted() {
        let (inv, cat) = setup().await;
        let stocked = inv.create_item(&ctx(), new_item(&cat, "Sander", 1)).await.unwrap();
        let empty = inv.create_item(&ctx(), new_item(&cat, "Brush", 0)).await.unwrap();

        let err = inv.delete_item(&ctx(), &stocked.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::ItemHasMovements { movements: 1, .. })
        ));

        inv.delete_item(&ctx(), &empty.id).await.unwrap();
        assert!(inv.get_item(&empty.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_category_in_use_cannot_be_deleted() {
        let (inv, cat) = setup().await;
        inv.create_item(&ctx(), new_item(&cat, "Mallet", 0)).await.unwrap();

        let err = inv.delete_category(&ctx(), &cat.id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(inv.get_category(&cat.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_supplier_delete_detaches_items() {
        let (inv, cat) = setup().await;
        let supplier = inv
            .create_supplier(
                &ctx(),
                NewSupplier {
                    name: "Acme".to_string(),
                    contact_email: Some("sales@acme.test".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let item = inv
            .create_item(
                &ctx(),
                NewItem {
                    supplier_id: Some(supplier.id.clone()),
                    ..new_item(&cat, "Grinder", 0)
                },
            )
            .await
            .unwrap();
        assert_eq!(item.supplier_id.as_deref(), Some(supplier.id.as_str()));

        inv.delete_supplier(&ctx(), &supplier.id).await.unwrap();
        assert_eq!(inv.get_item(&item.id).await.unwrap().supplier_id, None);
    }

    #[tokio::test]
    async fn test_item_with_unknown_category_is_not_found() {
        let (inv, _cat) = setup().await;
        let err = inv
            .create_item(
                &ctx(),
                NewItem {
                    name: "Orphan".to_string(),
                    category_id: Uuid::new_v4().to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Category"));
    }

    #[tokio::test]
    async fn test_category_and_supplier_updates() {
        let (inv, cat) = setup().await;
        let renamed = inv
            .update_category(
                &ctx(),
                &cat.id,
                CategoryUpdate {
                    name: Some("  Hand tools ".to_string()),
                    description: Some(Some("manual".to_string())),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Hand tools");
        assert_eq!(renamed.description.as_deref(), Some("manual"));

        let supplier = inv
            .create_supplier(
                &ctx(),
                NewSupplier {
                    name: "Bolt Co".to_string(),
                    contact_phone: Some("555-0100".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let updated = inv
            .update_supplier(
                &ctx(),
                &supplier.id,
                SupplierUpdate {
                    contact_phone: Some(None),
                    address: Some(Some("1 Main St".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.contact_phone, None);
        assert_eq!(updated.address.as_deref(), Some("1 Main St"));

        let err = inv
            .update_supplier(
                &ctx(),
                &supplier.id,
                SupplierUpdate {
                    contact_email: Some(Some("nope".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_items_by_category() {
        let (inv, tools) = setup().await;
        let garden = inv
            .create_category(
                &ctx(),
                NewCategory {
                    name: "Garden".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        inv.create_item(&ctx(), new_item(&tools, "Saw", 0)).await.unwrap();
        inv.create_item(&ctx(), new_item(&garden, "Hose", 0)).await.unwrap();
        inv.create_item(&ctx(), new_item(&tools, "Awl", 0)).await.unwrap();

        let names = |items: Vec<Item>| items.into_iter().map(|i| i.name).collect::<Vec<_>>();
        assert_eq!(
            names(inv.list_items(Some(&tools.id)).await.unwrap()),
            vec!["Awl", "Saw"]
        );
        assert_eq!(names(inv.list_items(None).await.unwrap()), vec!["Awl", "Hose", "Saw"]);

        let categories = inv.list_categories().await.unwrap();
        assert_eq!(categories.len(), 2);
    }

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_outbound_never_overdraws() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("stock.db")).max_connections(4))
            .await
            .unwrap();
        let inv = db.inventory();

        let cat = inv
            .create_category(
                &ctx(),
                NewCategory {
                    name: "Bulk".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        let item = inv.create_item(&ctx(), new_item(&cat, "Bolts", 10)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let inv = inv.clone();
            let request = movement(&item, MovementType::Outbound, 2);
            handles.push(tokio::spawn(async move {
                inv.record_movement(&RequestContext::new(), request).await
            }));
        }

        let mut accepted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(DbError::Core(CoreError::InsufficientQuantity { .. })) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(accepted, 5);
        assert_eq!(rejected, 5);
        assert_eq!(inv.get_item(&item.id).await.unwrap().available_quantity, 0);
        assert_eq!(inv.ledger_balance(&item.id).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_on_different_items() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("stock.db")).max_connections(4))
            .await
            .unwrap();
        let inv = db.inventory();

        let cat = inv
            .create_category(
                &ctx(),
                NewCategory {
                    name: "Bulk".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        let a = inv.create_item(&ctx(), new_item(&cat, "Nuts", 0)).await.unwrap();
        let b = inv.create_item(&ctx(), new_item(&cat, "Washers", 0)).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..12 {
            let inv = inv.clone();
            let target = if i % 2 == 0 { &a } else { &b };
            let request = movement(target, MovementType::Inbound, 1);
            handles.push(tokio::spawn(async move {
                inv.record_movement(&RequestContext::new(), request).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(inv.get_item(&a.id).await.unwrap().available_quantity, 6);
        assert_eq!(inv.get_item(&b.id).await.unwrap().available_quantity, 6);
    }
}
