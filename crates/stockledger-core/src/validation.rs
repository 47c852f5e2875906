//! # Validation Module
//!
//! Input validation for Stock Ledger writes.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  ├── Field types, movement_type names                                  │
//! │  └── Dates as YYYY-MM-DD                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Names, lengths, email shape                                       │
//! │  └── quantity > 0, monetary_value finite and >= 0                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign keys (category RESTRICT, supplier SET NULL)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockledger_core::validation::{validate_name, validate_quantity};
//!
//! validate_name("name", "Projector").unwrap();
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{
    CategoryUpdate, ItemUpdate, MovementUpdate, NewCategory, NewItem, NewMovement, NewSupplier,
    SupplierUpdate,
};
use crate::{MAX_NAME_LEN, MAX_SHORT_TEXT_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (category, supplier, item).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use stockledger_core::validation::validate_name;
///
/// assert!(validate_name("name", "Projector").is_ok());
/// assert!(validate_name("name", "   ").is_err());
/// assert!(validate_name("name", &"A".repeat(201)).is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an optional short text field (location, market reference,
/// contact fields). Absent values always pass.
pub fn validate_short_text(field: &str, value: Option<&str>) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > MAX_SHORT_TEXT_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_SHORT_TEXT_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates a contact email.
///
/// ## Rules
/// - Exactly one `@`
/// - Non-empty local part and domain
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    validate_short_text("contact_email", Some(email))?;

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "contact_email".to_string(),
        reason: reason.to_string(),
    };

    match email.split_once('@') {
        Some((local, domain)) if !domain.contains('@') => {
            if local.is_empty() || domain.is_empty() {
                Err(invalid("must have text on both sides of '@'"))
            } else {
                Ok(())
            }
        }
        _ => Err(invalid("must contain exactly one '@'")),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a movement quantity.
///
/// ## Rules
/// - Must be positive (> 0); direction comes from the movement type
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Record movement                                                        │
/// │                                                                         │
/// │  quantity: 0                                                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(0) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       └── OK → availability check, then insert                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i32) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates an item's monetary value.
///
/// ## Example
/// ```rust
/// use stockledger_core::validation::validate_monetary_value;
///
/// assert!(validate_monetary_value(0.0).is_ok());
/// assert!(validate_monetary_value(-0.01).is_err());
/// assert!(validate_monetary_value(f64::NAN).is_err());
/// ```
pub fn validate_monetary_value(value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: "monetary_value".to_string(),
        });
    }

    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: "monetary_value".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string reference.
///
/// ## Example
/// ```rust
/// use stockledger_core::validation::validate_uuid;
///
/// assert!(validate_uuid("item_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("item_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Input Validators
// =============================================================================

pub fn validate_new_category(input: &NewCategory) -> ValidationResult<()> {
    validate_name("name", &input.name)
}

pub fn validate_category_update(update: &CategoryUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.name {
        validate_name("name", name)?;
    }
    Ok(())
}

fn validate_contact(
    contact_name: Option<&str>,
    contact_email: Option<&str>,
    contact_phone: Option<&str>,
    address: Option<&str>,
) -> ValidationResult<()> {
    validate_short_text("contact_name", contact_name)?;
    if let Some(email) = contact_email {
        validate_email(email)?;
    }
    validate_short_text("contact_phone", contact_phone)?;
    validate_short_text("address", address)
}

pub fn validate_new_supplier(input: &NewSupplier) -> ValidationResult<()> {
    validate_name("name", &input.name)?;
    validate_contact(
        input.contact_name.as_deref(),
        input.contact_email.as_deref(),
        input.contact_phone.as_deref(),
        input.address.as_deref(),
    )
}

pub fn validate_supplier_update(update: &SupplierUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.name {
        validate_name("name", name)?;
    }
    validate_contact(
        update.contact_name.as_ref().and_then(|v| v.as_deref()),
        update.contact_email.as_ref().and_then(|v| v.as_deref()),
        update.contact_phone.as_ref().and_then(|v| v.as_deref()),
        update.address.as_ref().and_then(|v| v.as_deref()),
    )
}

/// Validates item creation input. `requested_quantity` may be any value,
/// including negative.
pub fn validate_new_item(input: &NewItem) -> ValidationResult<()> {
    validate_name("name", &input.name)?;
    validate_uuid("category_id", &input.category_id)?;
    if let Some(supplier_id) = &input.supplier_id {
        validate_uuid("supplier_id", supplier_id)?;
    }
    validate_short_text("location", input.location.as_deref())?;
    validate_short_text("market_reference", input.market_reference.as_deref())?;
    validate_monetary_value(input.monetary_value)
}

pub fn validate_item_update(update: &ItemUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.name {
        validate_name("name", name)?;
    }
    if let Some(category_id) = &update.category_id {
        validate_uuid("category_id", category_id)?;
    }
    if let Some(Some(supplier_id)) = &update.supplier_id {
        validate_uuid("supplier_id", supplier_id)?;
    }
    validate_short_text(
        "location",
        update.location.as_ref().and_then(|v| v.as_deref()),
    )?;
    validate_short_text(
        "market_reference",
        update.market_reference.as_ref().and_then(|v| v.as_deref()),
    )?;
    if let Some(value) = update.monetary_value {
        validate_monetary_value(value)?;
    }
    Ok(())
}

pub fn validate_new_movement(input: &NewMovement) -> ValidationResult<()> {
    validate_uuid("item_id", &input.item_id)?;
    validate_quantity(input.quantity)
}

pub fn validate_movement_update(update: &MovementUpdate) -> ValidationResult<()> {
    if let Some(item_id) = &update.item_id {
        validate_uuid("item_id", item_id)?;
    }
    if let Some(quantity) = update.quantity {
        validate_quantity(quantity)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
