//! # Label Payload & Rendering Interface
//!
//! Items carry a QR code (PNG) and a one-page PDF holding that QR code.
//! This module owns the pure part: which fields go into the payload and how
//! the text is laid out. Encoding to pixels and PDF lives behind
//! [`ArtifactRenderer`] (implemented by `stockledger-labels`).
//!
//! ## Payload Format
//! ```text
//! Name: Projector
//! Year: 2023-09-01
//! Market reference: MR-2023-17
//! Location: Room 12
//! ```
//! Absent optional values are written as `None`.

use chrono::NaiveDate;

use crate::error::RenderError;

/// The item fields embedded in the QR payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFields {
    pub name: String,
    pub acquisition_date: Option<NaiveDate>,
    pub market_reference: Option<String>,
    pub location: Option<String>,
}

impl LabelFields {
    /// Builds the plain-text QR payload with fixed labels and line breaks.
    pub fn payload(&self) -> String {
        format!(
            "Name: {}\nYear: {}\nMarket reference: {}\nLocation: {}",
            self.name,
            display_or_none(self.acquisition_date.as_ref()),
            display_or_none(self.market_reference.as_ref()),
            display_or_none(self.location.as_ref()),
        )
    }
}

fn display_or_none<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "None".to_string(), ToString::to_string)
}

/// Rendered label artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// QR code bitmap, PNG encoded.
    pub qr_png: Vec<u8>,
    /// Single-page PDF containing the QR bitmap.
    pub pdf: Vec<u8>,
}

/// Produces label artifacts from item fields.
///
/// Implementations hold no shared mutable state; the inventory service calls
/// them inside the item's transaction and stores the result on the row.
pub trait ArtifactRenderer: Send + Sync {
    fn render(&self, fields: &LabelFields) -> Result<Artifacts, RenderError>;
}
