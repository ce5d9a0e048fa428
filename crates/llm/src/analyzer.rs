//! Template analysis over the chat model
//!
//! Asks the model to describe a form's fillable fields as JSON and maps each one
//! to the abstract data keys it satisfies. Output that cannot be parsed is kept
//! as raw text so the template falls back to default mappings.

use async_trait::async_trait;
use dealer_assist_core::{
    AnalysisRequest, DiscoveredField, FormFieldSet, Message, Result, TemplateAnalyzer,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;

use crate::backend::LlmBackend;

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| Regex::new(r"```json\s*\n([\s\S]*?)\n\s*```").unwrap());

static BARE_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());

const ANALYSIS_INSTRUCTIONS: &str = r#"Analyze the PDF form template and identify all fillable form fields.
Return the result as a JSON object with field details including:
1. Field name/ID
2. Field type (text, checkbox, etc.)
3. Location hints (page number, form section)
4. Mapping to standard customer information fields

Example output format:
{
  "fields": [
    {
      "id": "fullName",
      "label": "Full Name",
      "type": "text",
      "page": 1,
      "section": "Personal Information",
      "mappings": ["firstName", "lastName"]
    }
  ]
}"#;

#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    fields: Vec<DiscoveredField>,
}

/// Parse a model reply into a field list.
///
/// Looks for a fenced json block first, then the outermost brace span.
pub fn parse_field_analysis(text: &str) -> FormFieldSet {
    let candidate = FENCED_JSON
        .captures(text)
        .and_then(|c| c.get(1))
        .or_else(|| BARE_OBJECT.find(text))
        .map(|m| m.as_str());

    let Some(json) = candidate else {
        return FormFieldSet::unparsed(text);
    };

    match serde_json::from_str::<AnalysisPayload>(json) {
        Ok(payload) => FormFieldSet::new(payload.fields),
        Err(e) => {
            tracing::warn!(error = %e, "Could not parse form structure from analysis");
            FormFieldSet::unparsed(text)
        }
    }
}

pub struct LlmTemplateAnalyzer {
    backend: Arc<dyn LlmBackend>,
    /// Abstract data keys the model may map fields to
    known_keys: Vec<String>,
}

impl LlmTemplateAnalyzer {
    pub fn new(backend: Arc<dyn LlmBackend>, known_keys: Vec<String>) -> Self {
        Self {
            backend,
            known_keys,
        }
    }

    fn build_messages(&self, request: &AnalysisRequest) -> Vec<Message> {
        let mut system = ANALYSIS_INSTRUCTIONS.to_string();
        if !self.known_keys.is_empty() {
            system.push_str("\n\nUse only these keys in \"mappings\": ");
            system.push_str(&self.known_keys.join(", "));
        }

        let mut user = format!(
            "Analyze this PDF template from a car dealership: {}\nThe template name is \"{}\".\nExtract all fillable form fields that would need customer information.",
            request.filename, request.name
        );
        if !request.form_field_names.is_empty() {
            user.push_str("\nThe form declares these field names: ");
            user.push_str(&request.form_field_names.join(", "));
        }

        vec![Message::system(system), Message::user(user)]
    }
}

#[async_trait]
impl TemplateAnalyzer for LlmTemplateAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<FormFieldSet> {
        let messages = self.build_messages(request);
        let result = self.backend.generate(&messages).await?;
        let fields = parse_field_analysis(&result.text);

        tracing::info!(
            template_id = %request.template_id,
            fields = fields.fields.len(),
            parsed = fields.raw_analysis.is_none(),
            "Template analysis finished"
        );

        Ok(fields)
    }
}
