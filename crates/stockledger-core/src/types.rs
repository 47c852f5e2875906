//! # Domain Types
//!
//! Core domain types used throughout Stock Ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────┐   ┌─────────────────┐  │
//! │  │    Category     │   │        Item          │   │    Movement     │  │
//! │  │  ─────────────  │   │  ──────────────────  │   │  ─────────────  │  │
//! │  │  id (UUID)      │◄──│  category_id (FK)    │◄──│  item_id (FK)   │  │
//! │  │  name           │   │  supplier_id (FK?)   │   │  category_id    │  │
//! │  │  description    │   │  available_quantity  │   │  quantity > 0   │  │
//! │  └─────────────────┘   │  qr_image / qr_pdf   │   │  movement_type  │  │
//! │                        │  requested_quantity  │   │  movement_date  │  │
//! │  ┌─────────────────┐   └──────────────────────┘   └─────────────────┘  │
//! │  │    Supplier     │              ▲                                     │
//! │  │  id, name,      │──────────────┘ 0..1                                │
//! │  │  contact info   │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity is keyed by a UUID v4 string that never changes.
//! `available_quantity` on [`Item`] is a cache rebuilt from [`Movement`] rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::label::LabelFields;

// =============================================================================
// Movement Type
// =============================================================================

/// Direction of a ledger entry.
///
/// ## Effect on Balance
/// ```text
/// inbound   → +quantity
/// outbound  → −quantity   (checked against availability)
/// loaned    → −quantity   (checked against availability)
/// returned  → +quantity
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Stock received.
    Inbound,
    /// Stock leaving permanently.
    Outbound,
    /// Stock lent out, expected back.
    Loaned,
    /// Lent stock coming back.
    Returned,
}

impl MovementType {
    /// All movement types, in display order.
    pub const ALL: [MovementType; 4] = [
        MovementType::Inbound,
        MovementType::Outbound,
        MovementType::Loaned,
        MovementType::Returned,
    ];

    /// Returns +1 for types that add stock and -1 for types that remove it.
    #[inline]
    pub const fn sign(self) -> i64 {
        match self {
            MovementType::Inbound | MovementType::Returned => 1,
            MovementType::Outbound | MovementType::Loaned => -1,
        }
    }

    /// Returns true if this movement draws down availability and must be
    /// checked against the current balance.
    #[inline]
    pub const fn consumes_stock(self) -> bool {
        matches!(self, MovementType::Outbound | MovementType::Loaned)
    }

    /// Lowercase wire/storage name.
    pub const fn as_str(self) -> &'static str {
        match self {
            MovementType::Inbound => "inbound",
            MovementType::Outbound => "outbound",
            MovementType::Loaned => "loaned",
            MovementType::Returned => "returned",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MovementType {
    type Err = crate::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inbound" | "in" => Ok(MovementType::Inbound),
            "outbound" | "out" => Ok(MovementType::Outbound),
            "loaned" | "loan" => Ok(MovementType::Loaned),
            "returned" | "return" => Ok(MovementType::Returned),
            _ => Err(crate::ValidationError::NotAllowed {
                field: "movement_type".to_string(),
                allowed: MovementType::ALL.iter().map(|t| t.to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// A named grouping for items and movements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional free text.
    pub description: Option<String>,

    /// When the category was created.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update of a category. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

// =============================================================================
// Supplier
// =============================================================================

/// A contact record optionally linked to items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a supplier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewSupplier {
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
}

/// Partial update of a supplier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplierUpdate {
    pub name: Option<String>,
    pub contact_name: Option<Option<String>>,
    pub contact_email: Option<Option<String>>,
    pub contact_phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
}

// =============================================================================
// Item
// =============================================================================

/// The stock-keeping unit.
///
/// `available_quantity` is derived from the item's movements and persisted as
/// a read cache. `qr_image` and `qr_pdf` are regenerated whenever a label
/// field changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Item {
    pub id: String,
    pub name: String,
    pub category_id: String,

    /// Derived balance: Σinbound − Σoutbound − Σloaned + Σreturned.
    pub available_quantity: i32,

    pub supplier_id: Option<String>,
    pub description: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub monetary_value: f64,
    pub market_reference: Option<String>,

    /// QR code as PNG bytes (base64 in JSON).
    #[serde(with = "base64_bytes", default)]
    pub qr_image: Option<Vec<u8>>,

    /// One-page PDF holding the QR code (base64 in JSON).
    #[serde(with = "base64_bytes", default)]
    pub qr_pdf: Option<Vec<u8>>,

    /// Last target quantity requested by a client.
    pub requested_quantity: i32,

    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Returns the four fields embedded in the QR payload.
    pub fn label_fields(&self) -> LabelFields {
        LabelFields {
            name: self.name.clone(),
            acquisition_date: self.acquisition_date,
            market_reference: self.market_reference.clone(),
            location: self.location.clone(),
        }
    }
}

/// Input for creating an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewItem {
    pub name: String,
    pub category_id: String,
    pub supplier_id: Option<String>,
    pub description: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub monetary_value: f64,
    pub market_reference: Option<String>,

    /// Initial stock; a non-zero value yields one compensating movement.
    pub requested_quantity: i32,
}

/// Partial update of an item. `None` leaves a field untouched; the nested
/// `Option` on nullable fields allows clearing them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub supplier_id: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub acquisition_date: Option<Option<NaiveDate>>,
    pub location: Option<Option<String>>,
    pub monetary_value: Option<f64>,
    pub market_reference: Option<Option<String>>,

    /// New target quantity; differing from the balance yields one
    /// compensating movement for the difference.
    pub requested_quantity: Option<i32>,
}

impl ItemUpdate {
    /// Returns true if a label field is present and differs from `current`.
    pub fn changes_label(&self, current: &Item) -> bool {
        self.name.as_ref().is_some_and(|n| *n != current.name)
            || self
                .acquisition_date
                .is_some_and(|d| d != current.acquisition_date)
            || self
                .market_reference
                .as_ref()
                .is_some_and(|m| *m != current.market_reference)
            || self
                .location
                .as_ref()
                .is_some_and(|l| *l != current.location)
    }

    /// Writes every present field onto `item`. Derived fields
    /// (`available_quantity`, artifacts) are left alone.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.trim().to_string();
        }
        if let Some(category_id) = &self.category_id {
            item.category_id = category_id.clone();
        }
        if let Some(supplier_id) = &self.supplier_id {
            item.supplier_id = supplier_id.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(date) = self.acquisition_date {
            item.acquisition_date = date;
        }
        if let Some(location) = &self.location {
            item.location = location.clone();
        }
        if let Some(value) = self.monetary_value {
            item.monetary_value = value;
        }
        if let Some(reference) = &self.market_reference {
            item.market_reference = reference.clone();
        }
        if let Some(requested) = self.requested_quantity {
            item.requested_quantity = requested;
        }
    }
}

// =============================================================================
// Movement
// =============================================================================

/// A single ledger entry changing an item's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Movement {
    pub id: String,
    pub item_id: String,

    /// Item's category at write time (denormalized for reporting).
    pub category_id: String,

    /// Always > 0; direction comes from `movement_type`.
    pub quantity: i32,
    pub movement_type: MovementType,
    pub movement_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// Signed effect of this movement on the balance.
    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        self.movement_type.sign() * i64::from(self.quantity)
    }
}

/// Input for recording a movement directly against the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMovement {
    pub item_id: String,
    pub quantity: i32,
    pub movement_type: MovementType,

    /// Defaults to today (UTC) when absent.
    #[serde(default)]
    pub movement_date: Option<NaiveDate>,
}

/// Partial update of a movement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementUpdate {
    pub item_id: Option<String>,
    pub quantity: Option<i32>,
    pub movement_type: Option<MovementType>,
    pub movement_date: Option<NaiveDate>,
}

impl MovementUpdate {
    /// Returns true if the update can change the movement's effect on
    /// availability (item, quantity or type).
    pub fn affects_balance(&self, current: &Movement) -> bool {
        self.item_id.as_ref().is_some_and(|i| *i != current.item_id)
            || self.quantity.is_some_and(|q| q != current.quantity)
            || self
                .movement_type
                .is_some_and(|t| t != current.movement_type)
    }

    /// Returns `current` with every present field applied.
    pub fn merged(&self, current: &Movement) -> Movement {
        Movement {
            id: current.id.clone(),
            item_id: self
                .item_id
                .clone()
                .unwrap_or_else(|| current.item_id.clone()),
            category_id: current.category_id.clone(),
            quantity: self.quantity.unwrap_or(current.quantity),
            movement_type: self.movement_type.unwrap_or(current.movement_type),
            movement_date: self.movement_date.unwrap_or(current.movement_date),
            created_at: current.created_at,
        }
    }
}

// =============================================================================
// Binary Serialization
// =============================================================================

/// Serde adapter: `Option<Vec<u8>>` as an optional standard base64 string.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
