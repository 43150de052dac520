// src/document.rs

use crate::calculator::{InvoiceTotals, format_currency};
use crate::config::InvoiceSection;
use crate::error::Result;
use crate::record::TransactionRecord;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::fs;
use std::path::{Path, PathBuf};
use time::{Date, Duration};
use tracing::info;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const ROW: f32 = 20.0;
const PLACEHOLDER: &str = "N/A";

/// Per-invoice identity: number and dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceMeta {
    pub number: String,
    pub issued: Date,
    pub due: Date,
}

impl InvoiceMeta {
    pub fn new(prefix: &str, transaction_id: i64, issued: Date, due_days: i64) -> Self {
        Self {
            number: format!("{prefix}-{transaction_id:03}"),
            issued,
            due: issued
                .checked_add(Duration::days(due_days))
                .unwrap_or(issued),
        }
    }
}

/// MM/DD/YYYY
pub fn format_date(date: Date) -> String {
    format!("{:02}/{:02}/{}", u8::from(date.month()), date.day(), date.year())
}

/// Lay out a one-page invoice for `record`. Unknown fields print as "N/A".
pub fn render_invoice(
    record: &TransactionRecord,
    totals: &InvoiceTotals,
    meta: &InvoiceMeta,
    company: &InvoiceSection,
) -> Result<Document> {
    let mut page = PageBuilder::default();
    let left = MARGIN;
    let right = PAGE_WIDTH - MARGIN;
    let mut y = PAGE_HEIGHT - MARGIN;

    // Company header
    page.text(BOLD, 16.0, left, y, &company.company_name);
    for line in &company.company_address {
        y -= ROW;
        page.text(REGULAR, 12.0, left, y, line);
    }

    // Bill to / ship to
    y -= 2.0 * ROW;
    let half = left + (right - left) / 2.0;
    page.text(BOLD, 12.0, left, y, "BILL TO:");
    page.text(BOLD, 12.0, half, y, "SHIP TO:");
    y -= ROW;
    page.text(REGULAR, 12.0, left, y, record.billing_address.or(PLACEHOLDER));
    page.text(REGULAR, 12.0, half, y, record.shipping_address.or(PLACEHOLDER));

    // Invoice details
    y -= 2.0 * ROW;
    page.text(REGULAR, 12.0, left, y, "INVOICE #");
    page.text(REGULAR, 12.0, left + 110.0, y, &meta.number);
    page.text(REGULAR, 12.0, half, y, "INVOICE DATE");
    page.text(REGULAR, 12.0, half + 110.0, y, &format_date(meta.issued));
    y -= ROW;
    page.text(REGULAR, 12.0, left, y, "PAYMENT");
    page.text(REGULAR, 12.0, left + 110.0, y, record.payment_method.or(PLACEHOLDER));
    page.text(REGULAR, 12.0, half, y, "DUE DATE");
    page.text(REGULAR, 12.0, half + 110.0, y, &format_date(meta.due));

    // Line item table: QTY | DESCRIPTION | UNIT PRICE | AMOUNT
    let cols = [left, left + 55.0, left + 265.0, left + 385.0, right];
    y -= 2.0 * ROW;
    for pair in cols.windows(2) {
        page.cell(pair[0], y, pair[1] - pair[0], ROW, true);
    }
    page.text_centered(BOLD, 11.0, cols[0], cols[1], y + 6.0, "QTY");
    page.text(BOLD, 11.0, cols[1] + 5.0, y + 6.0, "DESCRIPTION");
    page.text_right(BOLD, 11.0, cols[3] - 5.0, y + 6.0, "UNIT PRICE");
    page.text_right(BOLD, 11.0, cols[4] - 5.0, y + 6.0, "AMOUNT");

    y -= ROW;
    for pair in cols.windows(2) {
        page.cell(pair[0], y, pair[1] - pair[0], ROW, false);
    }
    page.text_centered(REGULAR, 11.0, cols[0], cols[1], y + 6.0, &totals.quantity.to_string());
    page.text(REGULAR, 11.0, cols[1] + 5.0, y + 6.0, record.service.or(PLACEHOLDER));
    page.text_right(REGULAR, 11.0, cols[3] - 5.0, y + 6.0, &format_currency(totals.unit_price));
    page.text_right(REGULAR, 11.0, cols[4] - 5.0, y + 6.0, &format_currency(totals.subtotal));

    // Totals block
    let tax_label = format!("Sales Tax {:.2}%", totals.tax_rate);
    let summary = [
        ("Subtotal", totals.subtotal, false),
        (tax_label.as_str(), totals.tax_amount, false),
        ("TOTAL", totals.total, true),
    ];
    for (label, amount, highlight) in summary {
        y -= ROW;
        page.cell(cols[0], y, cols[3] - cols[0], ROW, highlight);
        page.cell(cols[3], y, cols[4] - cols[3], ROW, highlight);
        let font = if highlight { BOLD } else { REGULAR };
        page.text_right(font, 11.0, cols[3] - 5.0, y + 6.0, label);
        page.text_right(font, 11.0, cols[4] - 5.0, y + 6.0, &format_currency(amount));
    }

    // Terms
    y -= 2.0 * ROW;
    for line in &company.terms {
        y -= ROW * 0.8;
        page.text(REGULAR, 11.0, left, y, line);
    }

    page.into_document()
}

/// Render and write the invoice to `output_dir/invoice-<id>.pdf`.
pub fn write_invoice(
    record: &TransactionRecord,
    totals: &InvoiceTotals,
    meta: &InvoiceMeta,
    company: &InvoiceSection,
    transaction_id: i64,
) -> Result<PathBuf> {
    let mut doc = render_invoice(record, totals, meta, company)?;
    fs::create_dir_all(&company.output_dir)?;
    let path = company.output_dir.join(format!("invoice-{transaction_id}.pdf"));
    save(&mut doc, &path)?;
    info!(path = %path.display(), number = %meta.number, "Invoice written");
    Ok(path)
}

fn save(doc: &mut Document, path: &Path) -> Result<()> {
    doc.compress();
    doc.save(path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Minimal single-page content builder
// ---------------------------------------------------------------------------

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

#[derive(Default)]
struct PageBuilder {
    operations: Vec<Operation>,
}

impl PageBuilder {
    fn text(&mut self, font: &str, size: f32, x: f32, y: f32, text: &str) {
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.into(), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(pdf_text(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn text_right(&mut self, font: &str, size: f32, right: f32, y: f32, text: &str) {
        let x = right - text_width(text, size, font == BOLD);
        self.text(font, size, x, y, text);
    }

    fn text_centered(&mut self, font: &str, size: f32, from: f32, to: f32, y: f32, text: &str) {
        let x = from + ((to - from) - text_width(text, size, font == BOLD)) / 2.0;
        self.text(font, size, x, y, text);
    }

    /// Bordered box; `fill` shades it light grey.
    fn cell(&mut self, x: f32, y: f32, w: f32, h: f32, fill: bool) {
        let paint = if fill { "B" } else { "S" };
        self.operations.extend([
            Operation::new("g", vec![0.78f32.into()]),
            Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]),
            Operation::new(paint, vec![]),
            // back to black for the text drawn on top
            Operation::new("g", vec![0.0f32.into()]),
        ]);
    }

    fn into_document(self) -> Result<Document> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR => regular_id,
                BOLD => bold_id,
            },
        });

        let content = Content {
            operations: self.operations,
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        Ok(doc)
    }
}

/// Standard fonts only cover Latin-1; anything else prints as '?'.
fn pdf_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
        .collect()
}

/// Rough Helvetica advance widths, good enough for right-aligning short labels.
fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let em: f32 = text
        .chars()
        .map(|c| match c {
            '0'..='9' | '$' => 0.556,
            '.' | ',' | ' ' | ':' => 0.278,
            '%' => 0.889,
            '#' | '/' => 0.5,
            'A'..='Z' => 0.667,
            'i' | 'j' | 'l' => 0.222,
            _ => 0.5,
        })
        .sum();
    let weight = if bold { 1.05 } else { 1.0 };
    em * size * weight
}
