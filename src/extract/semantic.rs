// src/extract/semantic.rs

use super::Tier;
use crate::error::ServiceError;
use crate::llm::TextGenerator;
use crate::record::{ExtractedFields, FieldName};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// Instructions plus one worked example; the example keeps the output shape stable.
const PROMPT_TEMPLATE: &str = r#"Extract the following details from the sentence below:
- Service: The service being offered or requested.
- Price: The price mentioned (e.g., $100).
- Tax: The tax rate or amount mentioned (e.g., 10% or $10).
- Payment Method: The payment method mentioned (e.g., credit card, PayPal).
- Billing Address: The billing address mentioned.
- Shipping Address: The shipping address mentioned.

Sentence: "{sentence}"

Return ONLY the details in the following JSON format, using null for anything not mentioned:
{
    "Service": "service name or null",
    "Price": "price or null",
    "Tax": "tax or null",
    "Payment Method": "payment method or null",
    "Billing Address": "billing address or null",
    "Shipping Address": "shipping address or null"
}

Example:
Input: "I need a graphic design service for $100 with a 10% tax. My billing address is 123 Main St, and the shipping address is 456 Elm St. I'll pay with a credit card."
Output:
{
    "Service": "graphic design",
    "Price": "$100",
    "Tax": "10%",
    "Payment Method": "credit card",
    "Billing Address": "123 Main St",
    "Shipping Address": "456 Elm St"
}"#;

pub fn build_prompt(sentence: &str) -> String {
    PROMPT_TEMPLATE.replace("{sentence}", sentence)
}

/// Ask the service for the six fields. `Err` only when no response came back
/// at all; a garbled response is salvaged instead.
pub async fn extract(
    generator: &dyn TextGenerator,
    sentence: &str,
) -> Result<(Tier, ExtractedFields), ServiceError> {
    let raw = generator.generate(&build_prompt(sentence)).await?;
    debug!(raw = %raw, "Raw extraction response");
    Ok(parse_response(&raw))
}

/// Structured parse first, regex salvage of the raw text second.
pub fn parse_response(raw: &str) -> (Tier, ExtractedFields) {
    match parse_structured(raw) {
        Ok(fields) => (Tier::Parsed, fields),
        Err(reason) => {
            warn!(reason = %reason, "Response is not valid JSON, salvaging fields with regex");
            (Tier::Salvaged, salvage(raw))
        }
    }
}

fn parse_structured(raw: &str) -> Result<ExtractedFields, String> {
    // Strip markdown fences if the model added them despite instructions
    let trimmed = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let json_str = extract_json_object(trimmed)?;
    let value: Value = serde_json::from_str(json_str).map_err(|e| e.to_string())?;
    let Value::Object(map) = value else {
        return Err("top-level value is not an object".to_string());
    };

    let mut fields = ExtractedFields::default();
    for name in FieldName::ALL {
        let found = map.get(name.label()).or_else(|| map.get(name.key()));
        fields.set(name, found.and_then(value_text));
    }
    Ok(fields)
}

/// Outermost `{...}` of a reply that may carry chatter around it.
fn extract_json_object(s: &str) -> Result<&str, String> {
    let start = s.find('{').ok_or("no '{' in response")?;
    let end = s.rfind('}').ok_or("no '}' in response")?;
    if end <= start {
        return Err("braces out of order".to_string());
    }
    Ok(&s[start..=end])
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => present(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Models sometimes spell null as a string.
fn present(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(s.to_string())
    }
}

/// Pull `"Key": "value"` fragments out of text that failed to parse. Never fails.
pub fn salvage(raw: &str) -> ExtractedFields {
    let mut fields = ExtractedFields::default();
    for name in FieldName::ALL {
        let pattern = format!(r#""{}"\s*:\s*"([^"]+)""#, regex::escape(name.label()));
        let value = Regex::new(&pattern)
            .ok()
            .and_then(|re| re.captures(raw).and_then(|c| present(&c[1])));
        fields.set(name, value);
    }
    fields
}
