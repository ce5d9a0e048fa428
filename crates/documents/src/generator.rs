//! Document generation
//!
//! Loads a template and its PDF bytes, resolves the field mapping and fills the
//! form. Batches run one template at a time; a failed template is reported in
//! its slot and does not stop the others.

use dealer_assist_config::DealerDomainConfig;
use dealer_assist_core::DocumentTemplate;
use dealer_assist_persistence::{TemplateFileStore, TemplateStore};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::acroform::fill_form;
use crate::mapping::FieldMapping;
use crate::DocumentError;

/// A filled document
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedDocument {
    pub template_id: String,
    pub template_name: String,
    /// Suggested download name
    pub filename: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Form fields that received a value
    pub filled_fields: Vec<String>,
}

/// Per-template result of a batch
#[derive(Debug)]
pub struct BatchItem {
    pub template_id: String,
    pub result: Result<GeneratedDocument, DocumentError>,
}

fn output_filename(template: &DocumentTemplate) -> String {
    let stem = template
        .filename
        .strip_suffix(".pdf")
        .unwrap_or(&template.filename);
    format!("{stem}-filled.pdf")
}

pub struct DocumentGenerator {
    domain: Arc<DealerDomainConfig>,
    templates: Arc<dyn TemplateStore>,
    files: Arc<dyn TemplateFileStore>,
}

impl DocumentGenerator {
    pub fn new(
        domain: Arc<DealerDomainConfig>,
        templates: Arc<dyn TemplateStore>,
        files: Arc<dyn TemplateFileStore>,
    ) -> Self {
        Self {
            domain,
            templates,
            files,
        }
    }

    async fn template(&self, template_id: &str) -> Result<DocumentTemplate, DocumentError> {
        self.templates
            .get(template_id)
            .await?
            .ok_or_else(|| DocumentError::TemplateNotFound(template_id.to_string()))
    }

    /// Fill one template with flattened form data
    pub async fn generate(
        &self,
        template_id: &str,
        form_data: &BTreeMap<String, String>,
    ) -> Result<GeneratedDocument, DocumentError> {
        let template = self.template(template_id).await?;
        let bytes = self
            .files
            .get(&template.storage_key())
            .await?
            .ok_or_else(|| DocumentError::FileUnavailable(template.filename.clone()))?;

        let mapping = FieldMapping::for_template(&self.domain, &template);
        let values = mapping.resolve(form_data);
        let filled = fill_form(&bytes, &values)?;

        tracing::info!(
            template_id = %template.id,
            mapping = ?mapping.source(),
            fields_written = filled.filled.len(),
            skipped = filled.skipped.len() + filled.missing.len(),
            "Document generated"
        );

        Ok(GeneratedDocument {
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            filename: output_filename(&template),
            bytes: filled.bytes,
            filled_fields: filled.filled,
        })
    }

    /// Fill several templates in order
    pub async fn generate_batch(
        &self,
        template_ids: &[String],
        form_data: &BTreeMap<String, String>,
    ) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(template_ids.len());
        for template_id in template_ids {
            let result = self.generate(template_id, form_data).await;
            if let Err(e) = &result {
                tracing::warn!(template_id = %template_id, error = %e, "Document generation failed");
            }
            items.push(BatchItem {
                template_id: template_id.clone(),
                result,
            });
        }
        items
    }

    /// Templates belonging to a scenario, by document id or explicit scenario list
    pub async fn templates_for_scenario(
        &self,
        scenario_id: &str,
        required_documents: &[String],
    ) -> Result<Vec<DocumentTemplate>, DocumentError> {
        let mut templates: Vec<_> = self
            .templates
            .list()
            .await?
            .into_iter()
            .filter(|t| t.applies_to(scenario_id, required_documents))
            .collect();

        // Signing order of the scenario, then templates matched only by scenario list
        templates.sort_by_key(|t| {
            t.document_id
                .as_ref()
                .and_then(|doc| required_documents.iter().position(|d| d == doc))
                .unwrap_or(usize::MAX)
        });
        Ok(templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_filename() {
        let template = DocumentTemplate::new("Delivery", "delivery.pdf");
        assert_eq!(output_filename(&template), "delivery-filled.pdf");
        let bare = DocumentTemplate::new("Notes", "notes");
        assert_eq!(output_filename(&bare), "notes-filled.pdf");
    }
}
