//! Inline tag extraction
//!
//! Tags must match exactly; anything malformed (missing close tag, empty value,
//! stray quotes) is left in the text untouched.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static FIELD_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<field name="([^"]+)">([^<]+)</field>"#).unwrap());

static SUGGESTION_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<sales_suggestion>([^<]+)</sales_suggestion>").unwrap());

/// Parsed model response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedResponse {
    /// Text with all matched tags removed, trimmed
    pub clean_text: String,
    /// Captured fields; a key tagged twice keeps its last value
    pub fields: BTreeMap<String, String>,
    /// First suggestion tag, if any
    pub suggestion: Option<String>,
}

impl ExtractedResponse {
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// Extract field and suggestion tags from free-form text
pub fn extract_structured(text: &str) -> ExtractedResponse {
    let mut fields = BTreeMap::new();
    for captures in FIELD_TAG.captures_iter(text) {
        let key = captures[1].to_string();
        let value = captures[2].to_string();
        if let Some(previous) = fields.insert(key, value) {
            tracing::debug!(previous = %previous, "Duplicate field tag, keeping later value");
        }
    }

    let suggestion = SUGGESTION_TAG
        .captures(text)
        .map(|captures| captures[1].to_string());

    let without_fields = FIELD_TAG.replace_all(text, "");
    let clean_text = SUGGESTION_TAG.replace(&without_fields, "").trim().to_string();

    ExtractedResponse {
        clean_text,
        fields,
        suggestion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_keys_extracted() {
        let text = r#"Thanks! <field name="firstName">Jane</field> and <field name="lastName">Doe</field>
<field name="vehicle_make">Honda</field>"#;
        let result = extract_structured(text);

        assert_eq!(result.fields.len(), 3);
        assert_eq!(result.fields["firstName"], "Jane");
        assert_eq!(result.fields["lastName"], "Doe");
        assert_eq!(result.fields["vehicle_make"], "Honda");
        assert!(!result.clean_text.contains("<field"));
        assert!(!result.clean_text.contains("</field>"));
        assert_eq!(result.clean_text, "Thanks!  and");
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let text = r#"<field name="cellPhone">(614) 555-0100</field> sorry, <field name="cellPhone">(614) 555-0199</field>"#;
        let result = extract_structured(text);

        assert_eq!(result.fields.len(), 1);
        assert_eq!(result.fields["cellPhone"], "(614) 555-0199");
        assert_eq!(result.clean_text, "sorry,");
    }

    #[test]
    fn test_suggestion_first_match_only() {
        let text = "Hi <sales_suggestion>Ask about budget</sales_suggestion> there \
                    <sales_suggestion>Second</sales_suggestion>";
        let result = extract_structured(text);

        assert_eq!(result.suggestion.as_deref(), Some("Ask about budget"));
        assert_eq!(
            result.clean_text,
            "Hi  there <sales_suggestion>Second</sales_suggestion>"
        );
    }

    #[test]
    fn test_no_tags_passes_through() {
        let result = extract_structured("  Just a normal reply.  ");
        assert!(result.fields.is_empty());
        assert!(result.suggestion.is_none());
        assert_eq!(result.clean_text, "Just a normal reply.");
    }

    #[test]
    fn test_malformed_tags_left_in_place() {
        let text = r#"Name: <field name="firstName">Jane and <field name="city"></field>"#;
        let result = extract_structured(text);

        assert!(result.fields.is_empty());
        assert_eq!(result.clean_text, text);
    }

    #[test]
    fn test_value_with_punctuation() {
        let text = r#"<field name="lender_payoffAmount">$12,345.67</field>"#;
        let result = extract_structured(text);
        assert_eq!(result.fields["lender_payoffAmount"], "$12,345.67");
        assert_eq!(result.clean_text, "");
    }
}
