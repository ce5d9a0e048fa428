//! Default form-field mapping table
//!
//! Candidate form field names for each abstract data key, grouped by record
//! category. Used when a template has no analysed mapping of its own.

use dealer_assist_core::FieldCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::ConfigError;

/// How important a key is to capture early in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionPriority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingEntry {
    pub form_locations: Vec<String>,
    #[serde(default)]
    pub priority: ExtractionPriority,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldMappingsConfig {
    #[serde(default)]
    pub customer: BTreeMap<String, MappingEntry>,
    #[serde(default)]
    pub vehicle: BTreeMap<String, MappingEntry>,
    #[serde(default)]
    pub trade_in: BTreeMap<String, MappingEntry>,
    #[serde(default)]
    pub lender: BTreeMap<String, MappingEntry>,
}

impl FieldMappingsConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_yaml_str(&content)
    }

    pub fn category(&self, category: FieldCategory) -> &BTreeMap<String, MappingEntry> {
        match category {
            FieldCategory::Customer => &self.customer,
            FieldCategory::Vehicle => &self.vehicle,
            FieldCategory::TradeIn => &self.trade_in,
            FieldCategory::Lender => &self.lender,
        }
    }

    /// Candidate form field names for an unprefixed key of a category
    pub fn locations(&self, category: FieldCategory, key: &str) -> &[String] {
        self.category(category)
            .get(key)
            .map(|entry| entry.form_locations.as_slice())
            .unwrap_or(&[])
    }

    /// Flattened keys with the given priority, category by category
    pub fn keys_with_priority(&self, priority: ExtractionPriority) -> Vec<String> {
        FieldCategory::ALL
            .into_iter()
            .flat_map(|category| {
                self.category(category)
                    .iter()
                    .filter(move |(_, entry)| entry.priority == priority)
                    .map(move |(key, _)| category.prefixed(key))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
customer:
  zipCode:
    form_locations: [Zip, Zip Code, Postal Code]
    priority: high
vehicle:
  miles:
    form_locations: [Miles, Mileage, Odometer]
trade_in:
  vin:
    form_locations: [Trade VIN]
    priority: high
"#;

    #[test]
    fn test_locations() {
        let config = FieldMappingsConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(
            config.locations(FieldCategory::Customer, "zipCode"),
            &["Zip".to_string(), "Zip Code".to_string(), "Postal Code".to_string()]
        );
        assert!(config.locations(FieldCategory::Lender, "name").is_empty());
        assert_eq!(
            config.vehicle["miles"].priority,
            ExtractionPriority::Medium
        );
    }

    #[test]
    fn test_keys_with_priority() {
        let config = FieldMappingsConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(
            config.keys_with_priority(ExtractionPriority::High),
            vec!["zipCode".to_string(), "tradeIn_vin".to_string()]
        );
    }
}
