use crate::errors::{AppError, Result};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{BuiltinFont, Color, Mm, PdfDocument, Point, Polygon, Rgb};
use qrcode::QrCode;
use sha2::{Digest, Sha256};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 18.0;
const LINE_STEP_MM: f32 = 7.0;
const QR_SIZE_MM: f32 = 50.0;

/// Rendered certificate artifact: the exact bytes plus their SHA-256 hex
/// checksum.
#[derive(Debug, Clone)]
pub struct RenderedCertificate {
    pub bytes: Vec<u8>,
    pub checksum: String,
}

/// Label/value lines printed on the certificate, in submission order.
pub type CertificateFields = Vec<(String, String)>;

/// Two-stage certificate pipeline. The QR code lives inside the document
/// whose checksum it references, so the checksum cannot be known before the
/// first render: stage one runs with a placeholder checksum in the QR
/// payload, stage two re-renders with the signed payload carrying the real
/// value.
pub struct CertificateRenderer;

impl CertificateRenderer {
    /// Stage one: render with a QR payload whose checksum field is empty.
    /// The returned checksum is the value that gets signed and embedded.
    pub fn render_provisional(
        fields: &CertificateFields,
        qr_text: &str,
    ) -> Result<RenderedCertificate> {
        Self::render(fields, qr_text)
    }

    /// Stage two: render again with the finalized, signed QR payload.
    pub fn render_final(fields: &CertificateFields, qr_text: &str) -> Result<RenderedCertificate> {
        Self::render(fields, qr_text)
    }

    fn render(fields: &CertificateFields, qr_text: &str) -> Result<RenderedCertificate> {
        let (doc, page, layer) = PdfDocument::new(
            "KYC Verification Document",
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let layer = doc.get_page(page).get_layer(layer);

        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::RenderError(format!("Font load failed: {}", e)))?;
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::RenderError(format!("Font load failed: {}", e)))?;

        layer.use_text(
            "KYC Verification Document",
            16.0,
            Mm(MARGIN_MM),
            Mm(PAGE_HEIGHT_MM - 20.0),
            &bold,
        );

        let mut y = PAGE_HEIGHT_MM - 36.0;
        for (label, value) in fields {
            layer.use_text(
                format!("{}: {}", label, value),
                11.0,
                Mm(MARGIN_MM),
                Mm(y),
                &regular,
            );
            y -= LINE_STEP_MM;
        }

        Self::draw_qr(&layer, qr_text)?;

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| AppError::RenderError(format!("PDF serialization failed: {}", e)))?;
        let checksum = format!("{:x}", Sha256::digest(&bytes));

        Ok(RenderedCertificate { bytes, checksum })
    }

    /// Draw the QR matrix as filled squares in the lower-right corner.
    fn draw_qr(layer: &printpdf::PdfLayerReference, qr_text: &str) -> Result<()> {
        let code = QrCode::new(qr_text.as_bytes())
            .map_err(|e| AppError::RenderError(format!("QR encoding failed: {}", e)))?;
        let width = code.width();
        let colors = code.to_colors();

        let module = QR_SIZE_MM / width as f32;
        let origin_x = PAGE_WIDTH_MM - MARGIN_MM - QR_SIZE_MM;
        let origin_y = 20.0_f32;

        layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));

        for (idx, color) in colors.iter().enumerate() {
            if *color != qrcode::Color::Dark {
                continue;
            }
            let row = idx / width;
            let col = idx % width;
            let x0 = origin_x + col as f32 * module;
            // Matrix row 0 is the top of the symbol; PDF y grows upward.
            let y0 = origin_y + (width - 1 - row) as f32 * module;

            let ring = vec![
                (Point::new(Mm(x0), Mm(y0)), false),
                (Point::new(Mm(x0 + module), Mm(y0)), false),
                (Point::new(Mm(x0 + module), Mm(y0 + module)), false),
                (Point::new(Mm(x0), Mm(y0 + module)), false),
            ];
            layer.add_polygon(Polygon {
                rings: vec![ring],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> CertificateFields {
        vec![
            ("KYC ID".to_string(), "ABC123DEF456".to_string()),
            ("Name".to_string(), "Asha Rao".to_string()),
            ("DOB".to_string(), "1990-04-21".to_string()),
            ("Gov ID (last4)".to_string(), "6789".to_string()),
        ]
    }

    #[test]
    fn checksum_matches_bytes() {
        let rendered = CertificateRenderer::render_provisional(&fields(), "placeholder").unwrap();
        let recomputed = format!("{:x}", Sha256::digest(&rendered.bytes));
        assert_eq!(rendered.checksum, recomputed);
    }

    #[test]
    fn output_is_a_pdf() {
        let rendered = CertificateRenderer::render_final(&fields(), "{\"sig\":\"x\"}").unwrap();
        assert!(rendered.bytes.starts_with(b"%PDF"));
        assert!(rendered.bytes.len() > 500);
    }

    #[test]
    fn qr_text_changes_the_document() {
        let a = CertificateRenderer::render_provisional(&fields(), "payload-a").unwrap();
        let b = CertificateRenderer::render_provisional(&fields(), "payload-b").unwrap();
        assert_ne!(a.checksum, b.checksum);
    }
}
