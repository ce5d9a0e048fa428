//! Field schema registry
//!
//! Static catalog of deal fields loaded once at startup from fields.yaml. Each field
//! knows its display name, where it lives in the deal record, whether it is required
//! for a given set of scenario features, an advisory validation pattern, and its
//! literal name inside each catalog document.

use dealer_assist_core::{DealRecord, FieldCategory, ScenarioFeature, ScenarioFeatures};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::ConfigError;

/// Requiredness of a field: a constant, or a scenario feature it depends on.
///
/// In YAML this is written as `true`/`false` or as a feature name such as
/// `trade_in` or `unpaid_trade`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    Constant(bool),
    When(ScenarioFeature),
}

impl Default for Requirement {
    fn default() -> Self {
        Requirement::Constant(false)
    }
}

impl Requirement {
    pub fn evaluate(&self, features: &ScenarioFeatures) -> bool {
        match self {
            Requirement::Constant(required) => *required,
            Requirement::When(feature) => features.has(*feature),
        }
    }
}

/// One field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: String,
    pub display_name: String,
    pub category: FieldCategory,
    /// Attribute name inside the category's record
    #[serde(default)]
    pub record_key: Option<String>,
    #[serde(default)]
    pub required: Requirement,
    /// Advisory pattern; values are never rejected on write
    #[serde(default)]
    pub validation: Option<String>,
    /// Catalog document id to the literal form field name in that document
    #[serde(default)]
    pub document_mapping: HashMap<String, String>,
}

impl FieldDefinition {
    pub fn is_required(&self, features: &ScenarioFeatures) -> bool {
        self.required.evaluate(features)
    }

    /// Key this field uses in flattened form data
    pub fn form_key(&self) -> String {
        match &self.record_key {
            Some(key) => self.category.prefixed(key),
            None => self.id.clone(),
        }
    }

    pub fn document_field(&self, document_id: &str) -> Option<&str> {
        self.document_mapping.get(document_id).map(String::as_str)
    }

    /// Typed attribute backing this field, if the record has one
    pub fn record_slot(&self) -> Option<(FieldCategory, &str)> {
        self.record_key
            .as_deref()
            .filter(|key| DealRecord::has_attribute(self.category, key))
            .map(|key| (self.category, key))
    }
}

#[derive(Debug, Deserialize)]
struct FieldsFile {
    fields: Vec<FieldDefinition>,
}

/// Ordered, id-indexed field catalog
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: Vec<FieldDefinition>,
    index: HashMap<String, usize>,
    patterns: Vec<Option<Regex>>,
}

impl FieldRegistry {
    /// Build a registry; ids must be unique and patterns must compile
    pub fn from_definitions(fields: Vec<FieldDefinition>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(fields.len());
        let mut patterns = Vec::with_capacity(fields.len());

        for (position, field) in fields.iter().enumerate() {
            if index.insert(field.id.clone(), position).is_some() {
                return Err(ConfigError::InvalidValue {
                    field: format!("fields.{}", field.id),
                    message: "Duplicate field id".to_string(),
                });
            }

            let pattern = match &field.validation {
                Some(source) => Some(Regex::new(source).map_err(|e| {
                    ConfigError::InvalidValue {
                        field: format!("fields.{}.validation", field.id),
                        message: e.to_string(),
                    }
                })?),
                None => None,
            };
            patterns.push(pattern);
        }

        Ok(Self {
            fields,
            index,
            patterns,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let file: FieldsFile = serde_yaml::from_str(content)?;
        Self::from_definitions(file.fields)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_yaml_str(&content)
    }

    pub fn get(&self, id: &str) -> Option<&FieldDefinition> {
        self.index.get(id).map(|&i| &self.fields[i])
    }

    /// All fields in registration order
    pub fn all(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Requiredness of a field under the given features; unknown ids are not required
    pub fn is_required(&self, id: &str, features: &ScenarioFeatures) -> bool {
        self.get(id).is_some_and(|f| f.is_required(features))
    }

    /// Check a value against the field's pattern.
    ///
    /// Returns `None` when the field is unknown or has no pattern.
    pub fn validate_value(&self, id: &str, value: &str) -> Option<bool> {
        let position = *self.index.get(id)?;
        self.patterns[position]
            .as_ref()
            .map(|pattern| pattern.is_match(value))
    }

    /// Fields that appear in a document, with their literal form names
    pub fn fields_for_document<'a>(
        &'a self,
        document_id: &'a str,
    ) -> impl Iterator<Item = (&'a FieldDefinition, &'a str)> + 'a {
        self.fields
            .iter()
            .filter_map(move |f| f.document_field(document_id).map(|name| (f, name)))
    }

    /// Value currently held for a field in a deal record
    pub fn value_in<'r>(&self, field: &FieldDefinition, record: &'r DealRecord) -> Option<&'r str> {
        match field.record_slot() {
            Some((category, key)) => record.get(category, key),
            None => record.extras.get(&field.id).map(String::as_str),
        }
    }

    /// Display names of filled fields whose value fails the advisory pattern
    pub fn validation_issues(&self, record: &DealRecord) -> Vec<String> {
        self.fields
            .iter()
            .zip(&self.patterns)
            .filter_map(|(field, pattern)| {
                let pattern = pattern.as_ref()?;
                let value = self.value_in(field, record).filter(|v| !v.is_empty())?;
                (!pattern.is_match(value)).then(|| field.display_name.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
fields:
  - id: firstName
    display_name: First Name
    category: customer
    record_key: firstName
    required: true
    validation: "^[A-Za-z]+$"
    document_mapping:
      delivery-report: NAME_FIRST
  - id: tradeVin
    display_name: Trade-in VIN
    category: trade_in
    record_key: vin
    required: trade_in
  - id: lenderName
    display_name: Bank/Lender Name
    category: lender
    record_key: name
    required: unpaid_trade
  - id: driversLicense
    display_name: Driver's License
    category: customer
"#;

    #[test]
    fn test_parse_requirements() {
        let registry = FieldRegistry::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(
            registry.get("firstName").unwrap().required,
            Requirement::Constant(true)
        );
        assert_eq!(
            registry.get("tradeVin").unwrap().required,
            Requirement::When(ScenarioFeature::TradeIn)
        );
        assert_eq!(
            registry.get("driversLicense").unwrap().required,
            Requirement::Constant(false)
        );
    }

    #[test]
    fn test_is_required_by_features() {
        let registry = FieldRegistry::from_yaml_str(SAMPLE).unwrap();
        let none = ScenarioFeatures::default();
        let unpaid = ScenarioFeatures {
            has_trade_in: true,
            trade_is_unpaid: true,
        };
        assert!(registry.is_required("firstName", &none));
        assert!(!registry.is_required("tradeVin", &none));
        assert!(registry.is_required("tradeVin", &unpaid));
        assert!(registry.is_required("lenderName", &unpaid));
        assert!(!registry.is_required("unknown", &unpaid));
    }

    #[test]
    fn test_order_is_registration_order() {
        let registry = FieldRegistry::from_yaml_str(SAMPLE).unwrap();
        let ids: Vec<&str> = registry.all().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["firstName", "tradeVin", "lenderName", "driversLicense"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = r#"
fields:
  - { id: city, display_name: City, category: customer }
  - { id: city, display_name: Town, category: customer }
"#;
        assert!(FieldRegistry::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let yaml = r#"
fields:
  - { id: city, display_name: City, category: customer, validation: "([a-z" }
"#;
        assert!(FieldRegistry::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_form_key_and_slot() {
        let registry = FieldRegistry::from_yaml_str(SAMPLE).unwrap();
        let trade_vin = registry.get("tradeVin").unwrap();
        assert_eq!(trade_vin.form_key(), "tradeIn_vin");
        assert_eq!(trade_vin.record_slot(), Some((FieldCategory::TradeIn, "vin")));

        let license = registry.get("driversLicense").unwrap();
        assert_eq!(license.form_key(), "driversLicense");
        assert_eq!(license.record_slot(), None);
    }

    #[test]
    fn test_validation_is_advisory() {
        let registry = FieldRegistry::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(registry.validate_value("firstName", "Jane"), Some(true));
        assert_eq!(registry.validate_value("firstName", "J4ne"), Some(false));
        assert_eq!(registry.validate_value("tradeVin", "anything"), None);

        let mut record = DealRecord::new();
        record.set(FieldCategory::Customer, "firstName", "J4ne");
        assert_eq!(registry.validation_issues(&record), vec!["First Name".to_string()]);
    }

    #[test]
    fn test_fields_for_document() {
        let registry = FieldRegistry::from_yaml_str(SAMPLE).unwrap();
        let names: Vec<&str> = registry
            .fields_for_document("delivery-report")
            .map(|(_, name)| name)
            .collect();
        assert_eq!(names, vec!["NAME_FIRST"]);
    }
}
