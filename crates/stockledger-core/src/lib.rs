//! # stockledger-core: Pure Ledger Logic for Stock Ledger
//!
//! This crate is the **heart** of Stock Ledger. It contains the ledger rules
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Stock Ledger Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              stockledger-db :: Inventory service                │   │
//! │  │   create_item, update_item, record_movement, update_movement    │   │
//! │  └───────────────┬─────────────────────────────┬───────────────────┘   │
//! │                  │                             │                        │
//! │  ┌───────────────▼─────────────────────┐ ┌────▼──────────────────┐    │
//! │  │   ★ stockledger-core (THIS CRATE) ★ │ │  stockledger-labels   │    │
//! │  │                                     │ │  QR PNG + PDF page    │    │
//! │  │  ┌────────┐ ┌────────┐ ┌─────────┐ │ │  (ArtifactRenderer)   │    │
//! │  │  │ types  │ │ ledger │ │  label  │ │ └───────────────────────┘    │
//! │  │  │ Item   │ │balance │ │ payload │ │                               │
//! │  │  │Movement│ │compens.│ │ trait   │ │                               │
//! │  │  └────────┘ └────────┘ └─────────┘ │                               │
//! │  │                                     │                               │
//! │  │  NO I/O • NO DATABASE • PURE        │                               │
//! │  └─────────────────────────────────────┘                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Category, Supplier, Item, Movement)
//! - [`ledger`] - Balance computation and compensating movements
//! - [`label`] - QR payload text and the rendering interface
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Example Usage
//!
//! ```rust
//! use stockledger_core::ledger::{compensating_movement, Compensation};
//! use stockledger_core::MovementType;
//!
//! // Item holds 10, the user asks for 7: one outbound movement of 3.
//! let comp = compensating_movement(10, 7).unwrap().unwrap();
//! assert_eq!(comp, Compensation { movement_type: MovementType::Outbound, quantity: 3 });
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod label;
pub mod ledger;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, RenderError, ValidationError};
pub use label::{ArtifactRenderer, Artifacts, LabelFields};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of entity names (category, supplier, item).
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length of short free-text fields (location, market reference,
/// contact fields).
pub const MAX_SHORT_TEXT_LEN: usize = 255;
