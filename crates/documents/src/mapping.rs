//! Data key to form field resolution
//!
//! A template either carries its own analysed mapping (each discovered form field
//! lists the data keys it satisfies) or falls back to the default table, grouped
//! by record category and augmented with the registry's literal names for the
//! catalog document the template implements.

use dealer_assist_config::DealerDomainConfig;
use dealer_assist_core::{DiscoveredField, DocumentTemplate, FieldCategory};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingSource {
    Analysis,
    Defaults,
}

#[derive(Debug, Clone)]
pub struct FieldMapping {
    source: MappingSource,
    /// Flattened data key to form field names
    direct: BTreeMap<String, Vec<String>>,
    /// Unprefixed key to form field names, per category
    by_category: HashMap<FieldCategory, BTreeMap<String, Vec<String>>>,
}

fn push_unique(targets: &mut Vec<String>, name: &str) {
    if !targets.iter().any(|t| t == name) {
        targets.push(name.to_string());
    }
}

impl FieldMapping {
    /// Mapping declared by analysed form fields
    pub fn from_analysis(fields: &[DiscoveredField]) -> Self {
        let mut direct: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for field in fields {
            for key in &field.mappings {
                push_unique(direct.entry(key.clone()).or_default(), &field.id);
            }
        }
        Self {
            source: MappingSource::Analysis,
            direct,
            by_category: HashMap::new(),
        }
    }

    /// Default table, plus registry names for `document_id` when given
    pub fn defaults(domain: &DealerDomainConfig, document_id: Option<&str>) -> Self {
        let mut direct: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut by_category: HashMap<FieldCategory, BTreeMap<String, Vec<String>>> =
            HashMap::new();

        for category in FieldCategory::ALL {
            let table = by_category.entry(category).or_default();
            for (key, entry) in domain.mappings.category(category) {
                table.insert(key.clone(), entry.form_locations.clone());
            }
        }

        if let Some(document_id) = document_id {
            for (field, form_name) in domain.fields.fields_for_document(document_id) {
                push_unique(direct.entry(field.form_key()).or_default(), form_name);
            }
        }

        Self {
            source: MappingSource::Defaults,
            direct,
            by_category,
        }
    }

    /// Analysed mapping when the template has one, else defaults
    pub fn for_template(domain: &DealerDomainConfig, template: &DocumentTemplate) -> Self {
        let analysed = FieldMapping::from_analysis(template.analyzed_fields());
        if !analysed.is_empty() {
            return analysed;
        }
        tracing::debug!(template_id = %template.id, "No analysed mapping, using defaults");
        FieldMapping::defaults(domain, template.document_id.as_deref())
    }

    pub fn source(&self) -> MappingSource {
        self.source
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.by_category.values().all(BTreeMap::is_empty)
    }

    /// Candidate form field names for a flattened data key, deduplicated in lookup order
    pub fn targets(&self, data_key: &str) -> Vec<String> {
        let mut targets = Vec::new();
        for name in self.direct.get(data_key).into_iter().flatten() {
            push_unique(&mut targets, name);
        }

        let (category, key) = FieldCategory::split_prefixed(data_key);
        // Analysed keys are not namespaced, so a prefixed key also matches its bare form
        if category != FieldCategory::Customer && self.source == MappingSource::Analysis {
            if let Some(names) = self.direct.get(key) {
                for name in names {
                    push_unique(&mut targets, name);
                }
            }
        }
        if let Some(names) = self.by_category.get(&category).and_then(|t| t.get(key)) {
            for name in names {
                push_unique(&mut targets, name);
            }
        }
        targets
    }

    /// Form field name to value for a flattened record
    pub fn resolve(&self, data: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut values = BTreeMap::new();
        for (key, value) in data {
            for target in self.targets(key) {
                values.entry(target).or_insert_with(|| value.clone());
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> DealerDomainConfig {
        DealerDomainConfig::builtin().unwrap()
    }

    fn discovered(id: &str, mappings: &[&str]) -> DiscoveredField {
        DiscoveredField {
            id: id.to_string(),
            label: String::new(),
            field_type: "text".to_string(),
            page: None,
            section: None,
            mappings: mappings.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_analysis_mapping() {
        let mapping = FieldMapping::from_analysis(&[
            discovered("NAME_FIRST", &["firstName"]),
            discovered("FULL_NAME", &["firstName", "lastName"]),
            discovered("MAKE", &["make"]),
        ]);
        assert_eq!(mapping.source(), MappingSource::Analysis);
        assert_eq!(mapping.targets("firstName"), vec!["NAME_FIRST", "FULL_NAME"]);
        // prefix stripped and looked up as a plain key
        assert_eq!(mapping.targets("vehicle_make"), vec!["MAKE"]);
        assert!(mapping.targets("city").is_empty());
    }

    #[test]
    fn test_defaults_by_category() {
        let mapping = FieldMapping::defaults(&domain(), None);
        assert_eq!(mapping.targets("firstName"), vec!["First Name", "Customer Name"]);
        assert!(mapping.targets("vehicle_vin").contains(&"VIN".to_string()));
        assert!(mapping.targets("unknown").is_empty());
    }

    #[test]
    fn test_defaults_include_document_names() {
        let mapping = FieldMapping::defaults(&domain(), Some("delivery-report"));
        let targets = mapping.targets("firstName");
        assert_eq!(targets[0], "NAME_FIRST");
        assert!(targets.contains(&"First Name".to_string()));
    }

    #[test]
    fn test_template_without_analysis_falls_back() {
        let domain = domain();
        let template = DocumentTemplate::new("Delivery", "delivery.pdf").with_document_id("delivery-report");
        let mapping = FieldMapping::for_template(&domain, &template);
        assert_eq!(mapping.source(), MappingSource::Defaults);

        let data = BTreeMap::from([("lastName".to_string(), "Doe".to_string())]);
        let values = mapping.resolve(&data);
        assert_eq!(values.get("NAME_LAST").map(String::as_str), Some("Doe"));
        assert_eq!(values.get("Last Name").map(String::as_str), Some("Doe"));
    }
}
