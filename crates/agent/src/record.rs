//! Deal record store
//!
//! Merges extracted key/value pairs into the typed deal record. A key is written
//! when it is a registry field id, a prefixed attribute (`vehicle_vin`,
//! `tradeIn_miles`, `lender_name`) or a customer attribute name. Everything else
//! is dropped. Values are stored as given; validation patterns are advisory.

use dealer_assist_config::DealerDomainConfig;
use dealer_assist_core::{DealRecord, FieldCategory};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::scenario::ActiveScenario;

/// Outcome of one merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppliedFields {
    /// Input keys that were written
    pub written: Vec<String>,
    /// Input keys that matched nothing
    pub dropped: Vec<String>,
}

impl AppliedFields {
    pub fn count(&self) -> usize {
        self.written.len()
    }
}

enum Target {
    Attribute(FieldCategory, String),
    Extra(String),
}

pub struct DealRecordStore {
    domain: Arc<DealerDomainConfig>,
    record: DealRecord,
}

impl DealRecordStore {
    pub fn from_domain(domain: &Arc<DealerDomainConfig>) -> Self {
        Self {
            domain: Arc::clone(domain),
            record: DealRecord::new(),
        }
    }

    pub fn record(&self) -> &DealRecord {
        &self.record
    }

    fn resolve(&self, key: &str) -> Option<Target> {
        if let Some(field) = self.domain.fields.get(key) {
            return Some(match field.record_slot() {
                Some((category, attribute)) => Target::Attribute(category, attribute.to_string()),
                None => Target::Extra(field.id.clone()),
            });
        }

        let (category, attribute) = FieldCategory::split_prefixed(key);
        DealRecord::has_attribute(category, attribute)
            .then(|| Target::Attribute(category, attribute.to_string()))
    }

    /// Merge extracted fields; keys absent from the input are left untouched
    pub fn apply_extracted_fields(&mut self, fields: &BTreeMap<String, String>) -> AppliedFields {
        let mut applied = AppliedFields::default();

        for (key, value) in fields {
            match self.resolve(key) {
                Some(Target::Attribute(category, attribute)) => {
                    self.record.set(category, &attribute, value.clone());
                    applied.written.push(key.clone());
                }
                Some(Target::Extra(id)) => {
                    self.record.extras.insert(id, value.clone());
                    applied.written.push(key.clone());
                }
                None => applied.dropped.push(key.clone()),
            }
        }

        if !applied.dropped.is_empty() {
            tracing::debug!(dropped = ?applied.dropped, "Ignored unknown extracted keys");
        }
        applied
    }

    /// Display names of required fields still empty, in registry order
    pub fn missing_required_fields(&self, scenario: Option<&ActiveScenario>) -> Vec<String> {
        let Some(scenario) = scenario else {
            return Vec::new();
        };

        let registry = &self.domain.fields;
        registry
            .all()
            .iter()
            .filter(|field| field.is_required(&scenario.features))
            .filter(|field| {
                registry
                    .value_in(field, &self.record)
                    .map_or(true, |value| value.trim().is_empty())
            })
            .map(|field| field.display_name.clone())
            .collect()
    }

    /// Display names of filled fields that fail their validation pattern
    pub fn validation_issues(&self) -> Vec<String> {
        self.domain.fields.validation_issues(&self.record)
    }

    /// Flattened form data for document filling
    pub fn form_data(&self) -> BTreeMap<String, String> {
        self.record.flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioResolver;

    fn store() -> (DealRecordStore, ScenarioResolver) {
        let domain = Arc::new(DealerDomainConfig::builtin().unwrap());
        (
            DealRecordStore::from_domain(&domain),
            ScenarioResolver::from_domain(&domain),
        )
    }

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_unknown_key_dropped() {
        let (mut store, _) = store();
        let applied = store.apply_extracted_fields(&fields(&[("randomKey", "x")]));
        assert_eq!(applied.count(), 0);
        assert_eq!(applied.dropped, vec!["randomKey".to_string()]);
        assert!(store.record().is_empty());
    }

    #[test]
    fn test_key_forms_resolve() {
        let (mut store, _) = store();
        let applied = store.apply_extracted_fields(&fields(&[
            ("firstName", "Jane"),
            ("streetAddress", "12 Oak St"),
            ("vehicleVin", "1HGCM82633A004352"),
            ("tradeIn_miles", "45000"),
            ("lender_name", "ABC Financial"),
        ]));

        assert_eq!(applied.count(), 5);
        let record = store.record();
        assert_eq!(record.customer.first_name.as_deref(), Some("Jane"));
        assert_eq!(record.customer.address.as_deref(), Some("12 Oak St"));
        assert_eq!(record.vehicle.vin.as_deref(), Some("1HGCM82633A004352"));
        assert_eq!(record.trade_in.miles.as_deref(), Some("45000"));
        assert_eq!(record.lender.name.as_deref(), Some("ABC Financial"));
    }

    #[test]
    fn test_merge_keeps_existing() {
        let (mut store, _) = store();
        store.apply_extracted_fields(&fields(&[("firstName", "Jane"), ("city", "Columbus")]));
        store.apply_extracted_fields(&fields(&[("firstName", "Janet")]));

        assert_eq!(store.record().customer.first_name.as_deref(), Some("Janet"));
        assert_eq!(store.record().customer.city.as_deref(), Some("Columbus"));
    }

    #[test]
    fn test_missing_required_by_scenario() {
        let (mut store, resolver) = store();
        assert!(store.missing_required_fields(None).is_empty());

        let unpaid = resolver.resolve("used-unpaid-trade");
        let no_trade = resolver.resolve("used-no-trade");
        let with_unpaid = store.missing_required_fields(Some(&unpaid));
        let without_trade = store.missing_required_fields(Some(&no_trade));

        assert!(with_unpaid.len() > without_trade.len());
        assert!(with_unpaid.iter().any(|name| name == "Payoff Amount"));
        assert!(!without_trade.iter().any(|name| name == "Trade-in VIN"));

        store.apply_extracted_fields(&fields(&[("firstName", "   ")]));
        let still_missing = store.missing_required_fields(Some(&no_trade));
        assert_eq!(still_missing[0], "First Name");
    }

    #[test]
    fn test_values_not_rejected() {
        let (mut store, _) = store();
        let applied = store.apply_extracted_fields(&fields(&[("zipCode", "not-a-zip")]));
        assert_eq!(applied.count(), 1);
        assert_eq!(store.validation_issues(), vec!["ZIP Code".to_string()]);
    }
}
