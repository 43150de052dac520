use crate::record::{Field, TransactionRecord};
use serde::Serialize;

/// Totals for the single-line invoice, derived fresh from a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InvoiceTotals {
    pub quantity: u32,
    pub unit_price: f64,
    /// Percentage, e.g. `10.0` for 10%.
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub subtotal: f64,
    pub total: f64,
}

/// Compute invoice totals. Unparseable price or tax counts as zero.
pub fn compute(record: &TransactionRecord) -> InvoiceTotals {
    let unit_price = parse_amount(&record.price);
    let tax_rate = parse_amount(&record.tax);
    let quantity = 1;

    let subtotal = unit_price * f64::from(quantity);
    let tax_amount = subtotal * tax_rate / 100.0;

    InvoiceTotals {
        quantity,
        unit_price,
        tax_rate,
        tax_amount,
        subtotal,
        total: subtotal + tax_amount,
    }
}

/// Keep only ASCII digits and `.`, then parse. "$1,250.50" -> 1250.5,
/// "1.2.3" or "" -> 0.0.
pub fn parse_amount(field: &Field) -> f64 {
    let Some(text) = field.as_known() else {
        return 0.0;
    };
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// `$1234.50` style, two decimals.
pub fn format_currency(amount: f64) -> String {
    format!("${amount:.2}")
}
