// src/heuristics/mod.rs

mod generic;

use crate::record::ExtractedFields;

/// Service names the regex fallback recognises, matched case-insensitively.
pub const SERVICE_VOCABULARY: &[&str] = &[
    "social media management",
    "graphic design",
    "design service",
    "web development",
    "consulting",
];

/// Payment methods in priority order: the first one found in the text wins.
pub const PAYMENT_METHODS: &[&str] = &["credit card", "debit card", "cash", "paypal", "bank transfer"];

/// Extract transaction fields straight from the sentence with keyword-anchored
/// patterns. Never fails; an unmatched field is simply `None`.
pub fn extract_fields(text: &str) -> ExtractedFields {
    generic::extract(text)
}
