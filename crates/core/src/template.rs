//! Uploadable PDF form templates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A form field discovered by template analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredField {
    /// Literal field name inside the PDF form
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub section: Option<String>,
    /// Abstract data keys this form field satisfies
    #[serde(default)]
    pub mappings: Vec<String>,
}

/// Result of analysing a template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFieldSet {
    #[serde(default)]
    pub fields: Vec<DiscoveredField>,
    /// Unparsed analyser output, kept when it could not be read as a field list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_analysis: Option<String>,
}

impl FormFieldSet {
    pub fn new(fields: Vec<DiscoveredField>) -> Self {
        Self {
            fields,
            raw_analysis: None,
        }
    }

    pub fn unparsed(raw: impl Into<String>) -> Self {
        Self {
            fields: Vec::new(),
            raw_analysis: Some(raw.into()),
        }
    }

    /// True when at least one field declares a mapping
    pub fn has_mappings(&self) -> bool {
        self.fields.iter().any(|f| !f.mappings.is_empty())
    }
}

/// Metadata for an uploaded PDF form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTemplate {
    pub id: String,
    pub name: String,
    /// Name the PDF was uploaded under
    pub filename: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Catalog document this template implements, if any
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub form_fields: Option<FormFieldSet>,
    #[serde(default)]
    pub required_scenarios: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentTemplate {
    pub fn new(name: impl Into<String>, filename: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            filename: filename.into(),
            category: None,
            description: None,
            document_id: None,
            form_fields: None,
            required_scenarios: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_document_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    pub fn with_scenarios(mut self, scenarios: Vec<String>) -> Self {
        self.required_scenarios = scenarios;
        self
    }

    /// Key of the PDF bytes in the file store, unique per template
    pub fn storage_key(&self) -> String {
        format!("{}.pdf", self.id)
    }

    /// Analysed fields, empty when analysis has not run
    pub fn analyzed_fields(&self) -> &[DiscoveredField] {
        self.form_fields
            .as_ref()
            .map(|set| set.fields.as_slice())
            .unwrap_or(&[])
    }

    /// Whether the template belongs to a scenario's document set
    pub fn applies_to(&self, scenario_id: &str, required_documents: &[String]) -> bool {
        self.required_scenarios.iter().any(|s| s == scenario_id)
            || self
                .document_id
                .as_ref()
                .is_some_and(|doc| required_documents.contains(doc))
    }
}
