//! # stockledger-labels: QR/PDF Label Rendering
//!
//! Implements [`ArtifactRenderer`] on top of `qrcode`, `image` and `printpdf`.
//!
//! ## Rendering Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Label Rendering                                   │
//! │                                                                         │
//! │  LabelFields::payload()  "Name: ...\nYear: ...\n..."                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  QrCode::with_error_correction_level(payload, ec)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  render::<Luma<u8>>()  module_size px per module, quiet zone           │
//! │       │                                                                 │
//! │       ├──────────────► PNG bytes ─────────────────► Item.qr_image      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Letter page (612 × 792 pt), image at (100, 600), 200 × 200 pt         │
//! │       │                                                                 │
//! │       └──────────────► PDF bytes ─────────────────► Item.qr_pdf        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The QR bitmap is embedded in the PDF as-is; only its physical size on the
//! page is fixed.

use std::io::Cursor;
use std::str::FromStr;

use image::{DynamicImage, ImageOutputFormat, Luma};
use printpdf::{Image, ImageTransform, Mm, PdfDocument};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use stockledger_core::{ArtifactRenderer, Artifacts, LabelFields, RenderError, ValidationError};

// =============================================================================
// Page Geometry
// =============================================================================

/// US letter width in points.
pub const PAGE_WIDTH_PT: f32 = 612.0;
/// US letter height in points.
pub const PAGE_HEIGHT_PT: f32 = 792.0;
/// Lower-left corner of the QR image, in points from the page origin.
pub const QR_ORIGIN_PT: (f32, f32) = (100.0, 600.0);
/// Side length of the QR image on the page, in points.
pub const QR_SIDE_PT: f32 = 200.0;

fn pt_to_mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

// =============================================================================
// Configuration
// =============================================================================

/// QR error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrErrorCorrection {
    /// ~7% recovery. Densest payload capacity.
    #[default]
    L,
    M,
    Q,
    /// ~30% recovery.
    H,
}

impl QrErrorCorrection {
    fn ec_level(self) -> EcLevel {
        match self {
            QrErrorCorrection::L => EcLevel::L,
            QrErrorCorrection::M => EcLevel::M,
            QrErrorCorrection::Q => EcLevel::Q,
            QrErrorCorrection::H => EcLevel::H,
        }
    }
}

impl FromStr for QrErrorCorrection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "l" => Ok(QrErrorCorrection::L),
            "m" => Ok(QrErrorCorrection::M),
            "q" => Ok(QrErrorCorrection::Q),
            "h" => Ok(QrErrorCorrection::H),
            _ => Err(ValidationError::NotAllowed {
                field: "error_correction".to_string(),
                allowed: ["l", "m", "q", "h"].iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

/// Label rendering settings, the `[labels]` table of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub error_correction: QrErrorCorrection,

    /// Pixels per QR module in the PNG.
    pub module_size: u32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            error_correction: QrErrorCorrection::L,
            module_size: 10,
        }
    }
}

// =============================================================================
// Renderer
// =============================================================================

/// Renders label artifacts with `qrcode` + `printpdf`.
#[derive(Debug, Clone, Default)]
pub struct QrPdfRenderer {
    config: LabelConfig,
}

impl QrPdfRenderer {
    pub fn new(config: LabelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    /// Encodes `payload` as a greyscale QR bitmap.
    fn qr_bitmap(&self, payload: &str) -> Result<DynamicImage, RenderError> {
        let code = QrCode::with_error_correction_level(
            payload.as_bytes(),
            self.config.error_correction.ec_level(),
        )
        .map_err(|e| RenderError::Encode(e.to_string()))?;

        let side = self.config.module_size.max(1);
        let buffer = code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .module_dimensions(side, side)
            .build();

        Ok(DynamicImage::ImageLuma8(buffer))
    }

    fn encode_png(bitmap: &DynamicImage) -> Result<Vec<u8>, RenderError> {
        let mut cursor = Cursor::new(Vec::new());
        bitmap
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .map_err(|e| RenderError::Image(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    /// Lays the bitmap out on a single letter-size page.
    fn build_pdf(title: &str, bitmap: &DynamicImage) -> Result<Vec<u8>, RenderError> {
        let (doc, page, layer) = PdfDocument::new(
            title,
            pt_to_mm(PAGE_WIDTH_PT),
            pt_to_mm(PAGE_HEIGHT_PT),
            "Layer 1",
        );
        let layer = doc.get_page(page).get_layer(layer);

        // printpdf sizes images by DPI: pick the one that maps the bitmap
        // width onto QR_SIDE_PT.
        let dpi = bitmap.width() as f32 * 72.0 / QR_SIDE_PT;

        Image::from_dynamic_image(bitmap).add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(pt_to_mm(QR_ORIGIN_PT.0)),
                translate_y: Some(pt_to_mm(QR_ORIGIN_PT.1)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );

        doc.save_to_bytes().map_err(|e| RenderError::Pdf(e.to_string()))
    }
}

impl ArtifactRenderer for QrPdfRenderer {
    fn render(&self, fields: &LabelFields) -> Result<Artifacts, RenderError> {
        let payload = fields.payload();
        let bitmap = self.qr_bitmap(&payload)?;
        let qr_png = Self::encode_png(&bitmap)?;
        let pdf = Self::build_pdf(&fields.name, &bitmap)?;

        debug!(
            payload_len = payload.len(),
            png_bytes = qr_png.len(),
            pdf_bytes = pdf.len(),
            "Rendered label artifacts"
        );

        Ok(Artifacts { qr_png, pdf })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> LabelFields {
        LabelFields {
            name: "Projector".to_string(),
            acquisition_date: None,
            market_reference: Some("MR-2023-17".to_string()),
            location: Some("Room 12".to_string()),
        }
    }

    /// Decodes a PNG produced by the renderer back into its text.
    fn decode_png(png: &[u8]) -> String {
        let img = image::load_from_memory(png).unwrap().to_luma8();
        let (w, h) = img.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(w as usize, h as usize, |x, y| {
                img.get_pixel(x as u32, y as u32).0[0]
            });
        let grids = prepared.detect_grids();
        assert_eq!(grids.len(), 1, "expected exactly one QR symbol");
        let (_meta, content) = grids[0].decode().unwrap();
        content
    }

    #[test]
    fn test_png_decodes_to_payload() {
        let renderer = QrPdfRenderer::default();
        let fields = fields();
        let artifacts = renderer.render(&fields).unwrap();

        assert_eq!(decode_png(&artifacts.qr_png), fields.payload());
    }

    #[test]
    fn test_rerender_after_change_decodes_new_payload() {
        let renderer = QrPdfRenderer::new(LabelConfig {
            error_correction: QrErrorCorrection::M,
            module_size: 6,
        });
        let mut fields = fields();
        let first = renderer.render(&fields).unwrap();

        fields.location = Some("Warehouse B".to_string());
        let second = renderer.render(&fields).unwrap();

        assert_ne!(first.qr_png, second.qr_png);
        assert!(decode_png(&second.qr_png).ends_with("Location: Warehouse B"));
    }

    #[test]
    fn test_pdf_is_a_pdf_document() {
        let artifacts = QrPdfRenderer::default().render(&fields()).unwrap();
        assert!(artifacts.pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_png_is_deterministic() {
        let renderer = QrPdfRenderer::default();
        let a = renderer.render(&fields()).unwrap();
        let b = renderer.render(&fields()).unwrap();
        assert_eq!(a.qr_png, b.qr_png);
    }

    #[test]
    fn test_oversized_payload_is_an_encode_error() {
        let mut fields = fields();
        fields.name = "X".repeat(8_000);
        let err = QrPdfRenderer::default().render(&fields).unwrap_err();
        assert!(matches!(err, RenderError::Encode(_)));
    }

    #[test]
    fn test_error_correction_parsing() {
        assert_eq!("H".parse::<QrErrorCorrection>().unwrap(), QrErrorCorrection::H);
        assert_eq!(" m ".parse::<QrErrorCorrection>().unwrap(), QrErrorCorrection::M);
        assert!("x".parse::<QrErrorCorrection>().is_err());
    }
}
