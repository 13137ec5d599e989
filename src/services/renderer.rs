//! Invoice document rendering.
//!
//! A single [`InvoiceDocument`] layout is built from an invoice view; the
//! plain-text preview and the PDF export both derive from it, so the two
//! outputs cannot disagree on content or totals.

use chrono::Datelike;
use printpdf::{BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::AppError;
use crate::models::{month_name, InvoiceStatus, InvoiceView};

const COMPANY_NAME: &str = "EMS Company";
const COMPANY_ADDRESS: [&str; 3] = [
    "123 Business Street",
    "City, State 12345",
    "Phone: (555) 123-4567",
];

// Tailwind-ish palette carried over from the desktop theme.
const TITLE_COLOR: (f32, f32, f32) = (0.055, 0.647, 0.914); // #0ea5e9
const PAID_COLOR: (f32, f32, f32) = (0.133, 0.773, 0.369); // #22c55e
const UNPAID_COLOR: (f32, f32, f32) = (0.976, 0.451, 0.086); // #f97316

/// Format a monetary value for display: `5000` -> `$5,000.00`.
pub fn format_amount(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2));
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    let mut count = 0;
    for i in (0..digits.len()).rev() {
        if count == 3 {
            grouped.push(',');
            count = 0;
        }
        grouped.push(digits[i]);
        count += 1;
    }
    let int_with_sep: String = grouped.chars().rev().collect();
    format!("${}.{}", int_with_sep, dec_part)
}

/// Parse a displayed monetary value back into a decimal. Lossless for any
/// string produced by [`format_amount`].
pub fn parse_amount(display: &str) -> Result<Decimal, AppError> {
    let cleaned: String = display
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    Decimal::from_str(&cleaned)
        .map_err(|e| AppError::Validation(anyhow::anyhow!("Invalid amount '{}': {}", display, e)))
}

/// Fixed-layout invoice document: issuer header, metadata, bill-to, the
/// Base Salary / Bonus item lines, total, status badge.
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub invoice_number: String,
    pub period: String,
    pub bill_to: String,
    pub lines: Vec<(&'static str, Decimal)>,
    pub total: Decimal,
    pub status: InvoiceStatus,
}

impl InvoiceDocument {
    pub fn badge_color(&self) -> (f32, f32, f32) {
        if self.status == InvoiceStatus::Paid {
            PAID_COLOR
        } else {
            UNPAID_COLOR
        }
    }

    /// Deterministic plain-text rendering for on-screen preview.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(COMPANY_NAME);
        out.push('\n');
        for line in COMPANY_ADDRESS {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out.push_str("INVOICE\n");
        out.push_str(&format!("Invoice #: {}\n", self.invoice_number));
        out.push_str(&format!("Date: {}\n\n", self.period));
        out.push_str("Bill To:\n");
        out.push_str(&self.bill_to);
        out.push_str("\n\n");
        out.push_str(&format!("{:<30}{:>16}\n", "Description", "Amount"));
        for (label, amount) in &self.lines {
            out.push_str(&format!("{:<30}{:>16}\n", label, format_amount(*amount)));
        }
        out.push_str(&format!("{:<30}{:>16}\n", "Total", format_amount(self.total)));
        out.push('\n');
        out.push_str(&format!("Status: {}\n", self.status.label()));
        out
    }

    /// Render the document to PDF bytes (letter size).
    pub fn to_pdf(&self) -> Result<Vec<u8>, AppError> {
        let (doc, page1, layer1) = PdfDocument::new(
            format!("Invoice {}", self.invoice_number),
            Mm(215.9),
            Mm(279.4),
            "Layer 1",
        );
        let layer = doc.get_page(page1).get_layer(layer1);

        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| AppError::DocumentIo(anyhow::anyhow!("Failed to load font: {}", e)))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| AppError::DocumentIo(anyhow::anyhow!("Failed to load font: {}", e)))?;

        let x_left = 18.0;
        let x_right = 140.0;
        let x_amount = 170.0;

        // Company block
        let mut y: f32 = 260.0;
        push_line(&layer, &font_bold, COMPANY_NAME, 20.0, x_left, y);
        y -= 8.0;
        for line in COMPANY_ADDRESS {
            push_line(&layer, &font, line, 10.0, x_left, y);
            y -= 5.0;
        }

        // Title and metadata, right side
        set_color(&layer, TITLE_COLOR);
        push_line(&layer, &font_bold, "INVOICE", 26.0, x_right, 260.0);
        set_color(&layer, (0.0, 0.0, 0.0));
        push_line(
            &layer,
            &font,
            &format!("Invoice #: {}", self.invoice_number),
            10.0,
            x_right,
            251.0,
        );
        push_line(
            &layer,
            &font,
            &format!("Date: {}", self.period),
            10.0,
            x_right,
            246.0,
        );

        divider(&layer, 236.0);

        // Bill-to
        push_line(&layer, &font_bold, "Bill To:", 12.0, x_left, 228.0);
        push_line(&layer, &font, &self.bill_to, 11.0, x_left, 221.0);

        // Item table
        let mut y = 204.0;
        push_line(&layer, &font_bold, "Description", 11.0, x_left, y);
        push_line(&layer, &font_bold, "Amount", 11.0, x_amount, y);
        y -= 3.0;
        divider(&layer, y);
        y -= 8.0;
        for (label, amount) in &self.lines {
            push_line(&layer, &font, label, 11.0, x_left, y);
            push_line(&layer, &font, &format_amount(*amount), 11.0, x_amount, y);
            y -= 8.0;
        }
        divider(&layer, y + 3.0);
        y -= 5.0;
        push_line(&layer, &font_bold, "Total", 12.0, x_left, y);
        push_line(
            &layer,
            &font_bold,
            &format_amount(self.total),
            12.0,
            x_amount,
            y,
        );

        // Status badge
        y -= 18.0;
        push_line(&layer, &font_bold, "Status:", 12.0, x_left, y);
        set_color(&layer, self.badge_color());
        push_line(&layer, &font, self.status.label(), 12.0, x_left + 20.0, y);
        set_color(&layer, (0.0, 0.0, 0.0));

        let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
        doc.save(&mut writer)
            .map_err(|e| AppError::DocumentIo(anyhow::anyhow!("Failed to write PDF: {}", e)))?;
        writer
            .into_inner()
            .map_err(|e| AppError::DocumentIo(anyhow::anyhow!("Failed to flush PDF: {}", e)))
    }
}

fn push_line(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    font_size: f32,
    x: f32,
    y: f32,
) {
    layer.use_text(text, font_size, Mm(x), Mm(y), font);
}

fn set_color(layer: &PdfLayerReference, (r, g, b): (f32, f32, f32)) {
    layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
}

fn divider(layer: &PdfLayerReference, y: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(18.0), Mm(y)), false),
            (Point::new(Mm(198.0), Mm(y)), false),
        ],
        is_closed: false,
    });
}

/// Builds invoice documents. Total is computed fresh at render time and is
/// never stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentRenderer;

impl DocumentRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn layout(&self, view: &InvoiceView) -> InvoiceDocument {
        InvoiceDocument {
            invoice_number: view.invoice_number.clone(),
            period: format!(
                "{} {}",
                month_name(view.issue_date.month()),
                view.issue_date.year()
            ),
            bill_to: view.employee_name.clone(),
            lines: vec![("Base Salary", view.amount), ("Bonus", view.bonus)],
            total: view.amount + view.bonus,
            status: view.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn view(amount: &str, bonus: &str, status: &str) -> InvoiceView {
        InvoiceView {
            invoice_id: 1,
            employee_name: "John Doe".to_string(),
            employee_email: "john@example.com".to_string(),
            invoice_number: "INV-202403-001".to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            bonus: Decimal::from_str(bonus).unwrap(),
            issue_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            status: status.to_string(),
        }
    }

    #[test]
    fn formats_with_currency_grouping() {
        assert_eq!(format_amount(Decimal::from_str("5000").unwrap()), "$5,000.00");
        assert_eq!(format_amount(Decimal::from_str("0").unwrap()), "$0.00");
        assert_eq!(format_amount(Decimal::from_str("0.5").unwrap()), "$0.50");
        assert_eq!(
            format_amount(Decimal::from_str("1234567.89").unwrap()),
            "$1,234,567.89"
        );
        assert_eq!(
            format_amount(Decimal::from_str("10000000").unwrap()),
            "$10,000,000.00"
        );
    }

    #[test]
    fn parse_is_lossless_over_formatted_output() {
        for raw in ["0", "0.50", "42.10", "5000.00", "999999.99", "10000000.00"] {
            let value = Decimal::from_str(raw).unwrap();
            let parsed = parse_amount(&format_amount(value)).unwrap();
            assert_eq!(parsed, value.round_dp(2));
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_amount("five dollars").is_err());
        assert!(parse_amount("").is_err());
    }

    #[test]
    fn layout_totals_amount_and_bonus() {
        let doc = DocumentRenderer::new().layout(&view("5000.00", "500.00", "pending"));
        assert_eq!(doc.total, Decimal::from_str("5500.00").unwrap());
        assert_eq!(doc.period, "March 2024");
        assert_eq!(doc.lines.len(), 2);
    }

    #[test]
    fn preview_and_pdf_share_layout_content() {
        let doc = DocumentRenderer::new().layout(&view("5000.00", "500.00", "pending"));
        let text = doc.to_text();
        assert!(text.contains("INV-202403-001"));
        assert!(text.contains("$5,500.00"));
        assert!(text.contains("Status: Pending"));

        let pdf = doc.to_pdf().unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn badge_color_tracks_status() {
        let renderer = DocumentRenderer::new();
        let paid = renderer.layout(&view("100", "0", "paid"));
        let pending = renderer.layout(&view("100", "0", "pending"));
        assert_eq!(paid.badge_color(), PAID_COLOR);
        assert_eq!(pending.badge_color(), UNPAID_COLOR);
    }
}
