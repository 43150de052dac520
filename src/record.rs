// src/record.rs

use serde::Serialize;
use std::fmt;

/// A single record slot: either a captured value or the explicit unknown marker.
///
/// Serialized as a string or `null`, so the marker can never collide with
/// real text such as a service literally called "unknown".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(into = "Option<String>")]
pub enum Field {
    Known(String),
    #[default]
    Unknown,
}

impl Field {
    pub fn known(value: impl Into<String>) -> Self {
        Field::from(Some(value.into()))
    }

    pub fn as_known(&self) -> Option<&str> {
        match self {
            Field::Known(v) => Some(v),
            Field::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Field::Known(_))
    }

    /// The value, or `placeholder` for the unknown marker.
    pub fn or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.as_known().unwrap_or(placeholder)
    }
}

impl From<Option<String>> for Field {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => Field::Known(v.trim().to_string()),
            _ => Field::Unknown,
        }
    }
}

impl From<Field> for Option<String> {
    fn from(field: Field) -> Self {
        match field {
            Field::Known(v) => Some(v),
            Field::Unknown => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Known(v) => f.write_str(v),
            Field::Unknown => f.write_str("<unknown>"),
        }
    }
}

/// The six slots of the transaction schema, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldName {
    Service,
    Price,
    Tax,
    PaymentMethod,
    BillingAddress,
    ShippingAddress,
}

impl FieldName {
    pub const ALL: [FieldName; 6] = [
        FieldName::Service,
        FieldName::Price,
        FieldName::Tax,
        FieldName::PaymentMethod,
        FieldName::BillingAddress,
        FieldName::ShippingAddress,
    ];

    /// Key used in the JSON payload exchanged with the generative service.
    pub fn label(self) -> &'static str {
        match self {
            FieldName::Service => "Service",
            FieldName::Price => "Price",
            FieldName::Tax => "Tax",
            FieldName::PaymentMethod => "Payment Method",
            FieldName::BillingAddress => "Billing Address",
            FieldName::ShippingAddress => "Shipping Address",
        }
    }

    /// Snake-case key, as used by the record and the database columns.
    pub fn key(self) -> &'static str {
        match self {
            FieldName::Service => "service",
            FieldName::Price => "price",
            FieldName::Tax => "tax",
            FieldName::PaymentMethod => "payment_method",
            FieldName::BillingAddress => "billing_address",
            FieldName::ShippingAddress => "shipping_address",
        }
    }
}

/// Raw output of one extractor. `None` means that extractor found nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub service: Option<String>,
    pub price: Option<String>,
    pub tax: Option<String>,
    pub payment_method: Option<String>,
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,
}

impl ExtractedFields {
    pub fn get(&self, name: FieldName) -> Option<&str> {
        self.slot(name).as_deref()
    }

    pub fn set(&mut self, name: FieldName, value: Option<String>) {
        *self.slot_mut(name) = value;
    }

    fn slot(&self, name: FieldName) -> &Option<String> {
        match name {
            FieldName::Service => &self.service,
            FieldName::Price => &self.price,
            FieldName::Tax => &self.tax,
            FieldName::PaymentMethod => &self.payment_method,
            FieldName::BillingAddress => &self.billing_address,
            FieldName::ShippingAddress => &self.shipping_address,
        }
    }

    fn slot_mut(&mut self, name: FieldName) -> &mut Option<String> {
        match name {
            FieldName::Service => &mut self.service,
            FieldName::Price => &mut self.price,
            FieldName::Tax => &mut self.tax,
            FieldName::PaymentMethod => &mut self.payment_method,
            FieldName::BillingAddress => &mut self.billing_address,
            FieldName::ShippingAddress => &mut self.shipping_address,
        }
    }

    /// How many fields were found (out of six).
    pub fn coverage(&self) -> (usize, usize) {
        let filled = FieldName::ALL
            .iter()
            .filter(|&&n| self.get(n).is_some())
            .count();
        (filled, FieldName::ALL.len())
    }
}

/// The canonical, fully populated record for one submitted sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub service: Field,
    pub price: Field,
    pub tax: Field,
    pub payment_method: Field,
    pub billing_address: Field,
    pub shipping_address: Field,
}

impl TransactionRecord {
    pub fn get(&self, name: FieldName) -> &Field {
        match name {
            FieldName::Service => &self.service,
            FieldName::Price => &self.price,
            FieldName::Tax => &self.tax,
            FieldName::PaymentMethod => &self.payment_method,
            FieldName::BillingAddress => &self.billing_address,
            FieldName::ShippingAddress => &self.shipping_address,
        }
    }

    pub fn coverage(&self) -> (usize, usize) {
        let filled = FieldName::ALL
            .iter()
            .filter(|&&n| self.get(n).is_known())
            .count();
        (filled, FieldName::ALL.len())
    }
}
