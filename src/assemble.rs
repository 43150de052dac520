use crate::record::{ExtractedFields, Field, FieldName, TransactionRecord};

/// Merge extractor output into the canonical record.
///
/// Per field: the primary value, else the fallback value, else `Field::Unknown`.
/// The fallback is only passed when the primary extraction failed outright.
pub fn assemble(
    primary: Option<&ExtractedFields>,
    fallback: Option<&ExtractedFields>,
) -> TransactionRecord {
    let pick = |name: FieldName| -> Field {
        let value = found(primary, name).or_else(|| found(fallback, name));
        Field::from(value.map(str::to_string))
    };

    TransactionRecord {
        service: pick(FieldName::Service),
        price: pick(FieldName::Price),
        tax: pick(FieldName::Tax),
        payment_method: pick(FieldName::PaymentMethod),
        billing_address: pick(FieldName::BillingAddress),
        shipping_address: pick(FieldName::ShippingAddress),
    }
}

fn found(fields: Option<&ExtractedFields>, name: FieldName) -> Option<&str> {
    fields
        .and_then(|f| f.get(name))
        .filter(|v| !v.trim().is_empty())
}
