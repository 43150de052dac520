use super::{PAYMENT_METHODS, SERVICE_VOCABULARY};
use crate::record::ExtractedFields;
use regex::Regex;

/// Main extraction entry point. Every field is looked up independently.
pub fn extract(text: &str) -> ExtractedFields {
    ExtractedFields {
        service: extract_service(text),
        price: extract_price(text),
        tax: extract_tax(text),
        payment_method: extract_payment_method(text),
        billing_address: extract_address(text, "billing"),
        shipping_address: extract_address(text, "shipping"),
    }
}

fn extract_service(text: &str) -> Option<String> {
    let alternatives = SERVICE_VOCABULARY
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|");
    let re = Regex::new(&format!("(?i)({alternatives})")).ok()?;
    // leftmost hit in the sentence, keeping the user's casing
    re.captures(text).map(|c| c[1].to_string())
}

fn extract_price(text: &str) -> Option<String> {
    // "$100", "$ 1,250.50" or "100 dollars"
    let re = Regex::new(r"(?i)\$\s?\d+(?:,\d{3})*(?:\.\d+)?|\b\d+(?:,\d{3})*(?:\.\d+)?\s*dollars\b").ok()?;
    re.find(text).map(|m| m.as_str().to_string())
}

fn extract_tax(text: &str) -> Option<String> {
    // the number must touch the sign: "10%", never "10 %"
    let re = Regex::new(r"\b(\d+(?:\.\d+)?)%").ok()?;
    re.captures(text).map(|c| format!("{}%", &c[1]))
}

fn extract_payment_method(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    PAYMENT_METHODS
        .iter()
        .find(|method| lower.contains(*method))
        .map(|method| method.to_string())
}

fn extract_address(text: &str, kind: &str) -> Option<String> {
    // only the single token after the phrase; multi-word addresses are the
    // generative extractor's job
    let re = Regex::new(&format!(r"(?i){kind}\s+address\s+is\s+([A-Za-z0-9]+)")).ok()?;
    re.captures(text).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_all_none() {
        assert_eq!(extract(""), ExtractedFields::default());
    }

    #[test]
    fn test_paypal_and_billing() {
        let fields = extract("I'll pay with paypal and my billing address is NewYork");
        assert_eq!(fields.payment_method.as_deref(), Some("paypal"));
        assert_eq!(fields.billing_address.as_deref(), Some("NewYork"));
        assert_eq!(fields.shipping_address, None);
        assert_eq!(fields.service, None);
        assert_eq!(fields.price, None);
    }

    #[test]
    fn test_full_sentence() {
        let fields = extract(
            "I need Graphic Design for $250 with 8% tax, paying by credit card. \
             My billing address is Boston and the shipping address is Denver.",
        );
        assert_eq!(fields.service.as_deref(), Some("Graphic Design"));
        assert_eq!(fields.price.as_deref(), Some("$250"));
        assert_eq!(fields.tax.as_deref(), Some("8%"));
        assert_eq!(fields.payment_method.as_deref(), Some("credit card"));
        assert_eq!(fields.billing_address.as_deref(), Some("Boston"));
        assert_eq!(fields.shipping_address.as_deref(), Some("Denver"));
    }

    #[test]
    fn test_price_in_dollars_and_decimals() {
        assert_eq!(
            extract("that costs 300 Dollars total").price.as_deref(),
            Some("300 Dollars")
        );
        assert_eq!(extract("only $1,299.99").price.as_deref(), Some("$1,299.99"));
        assert_eq!(extract("tax 7.5% applies").tax.as_deref(), Some("7.5%"));
    }

    #[test]
    fn test_first_match_wins() {
        let fields = extract("$10 now and $20 later, 5% then 10%");
        assert_eq!(fields.price.as_deref(), Some("$10"));
        assert_eq!(fields.tax.as_deref(), Some("5%"));
    }

    #[test]
    fn test_detached_percent_sign_is_not_tax() {
        assert_eq!(extract("the rate is 10 % on this").tax, None);
        assert_eq!(extract("10 % now, 12% later").tax.as_deref(), Some("12%"));
    }

    #[test]
    fn test_payment_method_list_order() {
        // list order decides, not position in the sentence
        let fields = extract("either bank transfer or cash is fine");
        assert_eq!(fields.payment_method.as_deref(), Some("cash"));
    }

    #[test]
    fn test_service_leftmost() {
        let fields = extract("after the consulting we want social media management");
        assert_eq!(fields.service.as_deref(), Some("consulting"));
    }

    #[test]
    fn test_noise_never_panics() {
        for input in ["%%%", "$", "dollars", "billing address is", "€100 ☃ 10 %"] {
            let _ = extract(input);
        }
        assert_eq!(extract("billing address is").billing_address, None);
    }
}
