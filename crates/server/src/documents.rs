//! Template and document endpoints
//!
//! Templates are uploaded as JSON with base64 PDF content. Generated documents
//! come back as a PDF body (single) or as base64 inside JSON (scenario batch).

use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dealer_assist_core::{AnalysisRequest, DocumentTemplate, FormFieldSet};
use dealer_assist_documents::{inspect_form_fields, FormFieldInfo};
use serde::{Deserialize, Serialize};

use crate::metrics::record_document;
use crate::state::AppState;
use crate::ServerError;

#[derive(Debug, Deserialize)]
pub struct UploadTemplateRequest {
    pub name: String,
    /// Storage name of the PDF
    pub filename: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Catalog document this template implements
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub required_scenarios: Vec<String>,
    pub content_base64: String,
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub template: DocumentTemplate,
    /// Fields declared by the PDF form itself
    pub form_fields: Vec<FormFieldInfo>,
}

fn validate_filename(filename: &str) -> Result<(), ServerError> {
    let invalid = filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..");
    if invalid {
        return Err(ServerError::InvalidRequest(format!("invalid filename: {filename}")));
    }
    Ok(())
}

pub async fn upload_template(
    State(state): State<AppState>,
    Json(request): Json<UploadTemplateRequest>,
) -> Result<(StatusCode, Json<TemplateResponse>), ServerError> {
    if request.name.trim().is_empty() {
        return Err(ServerError::InvalidRequest("name is empty".to_string()));
    }
    validate_filename(&request.filename)?;

    let bytes = BASE64
        .decode(request.content_base64.as_bytes())
        .map_err(|e| ServerError::InvalidRequest(format!("content is not base64: {e}")))?;
    let form_fields = inspect_form_fields(&bytes)
        .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

    let mut template = DocumentTemplate::new(request.name.trim(), request.filename)
        .with_scenarios(request.required_scenarios);
    template.category = request.category;
    template.description = request.description;
    template.document_id = request.document_id;

    if let Some(document_id) = &template.document_id {
        if !state.domain.documents.contains(document_id) {
            tracing::warn!(document_id = %document_id, "Template names a document outside the catalog");
        }
    }

    state.persistence.files.put(&template.storage_key(), &bytes).await?;
    state.persistence.templates.save(&template).await?;

    tracing::info!(
        template_id = %template.id,
        filename = %template.filename,
        form_fields = form_fields.len(),
        "Template uploaded"
    );
    Ok((
        StatusCode::CREATED,
        Json(TemplateResponse {
            template,
            form_fields,
        }),
    ))
}

pub async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let templates = state.persistence.templates.list().await?;
    Ok(Json(serde_json::json!({
        "count": templates.len(),
        "templates": templates,
    })))
}

async fn load_template(state: &AppState, id: &str) -> Result<DocumentTemplate, ServerError> {
    state
        .persistence
        .templates
        .get(id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("template {id}")))
}

pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TemplateResponse>, ServerError> {
    let template = load_template(&state, &id).await?;
    let form_fields = match state.persistence.files.get(&template.storage_key()).await? {
        Some(bytes) => inspect_form_fields(&bytes).unwrap_or_else(|e| {
            tracing::warn!(template_id = %id, error = %e, "Stored template is not readable");
            Vec::new()
        }),
        None => Vec::new(),
    };
    Ok(Json(TemplateResponse {
        template,
        form_fields,
    }))
}

pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let template = load_template(&state, &id).await?;
    state.persistence.templates.delete(&id).await?;
    state.persistence.files.delete(&template.storage_key()).await?;
    tracing::info!(template_id = %id, "Template deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Discover the template's fields and store them as its mapping
pub async fn analyze_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FormFieldSet>, ServerError> {
    let template = load_template(&state, &id).await?;
    let bytes = state
        .persistence
        .files
        .get(&template.storage_key())
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("template file {}", template.filename)))?;
    let form_field_names = inspect_form_fields(&bytes)
        .map(|fields| fields.into_iter().map(|f| f.name).collect())
        .unwrap_or_default();

    let request = AnalysisRequest {
        template_id: template.id.clone(),
        name: template.name.clone(),
        filename: template.filename.clone(),
        form_field_names,
    };
    let fields = state.analyzer.analyze(&request).await?;
    state.persistence.templates.set_form_fields(&id, &fields).await?;

    Ok(Json(fields))
}

/// Fill one template from the session's record and return the PDF
pub async fn generate_document(
    State(state): State<AppState>,
    Path((session_id, template_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServerError> {
    let form_data = {
        let entry = state.sessions.get(&session_id)?;
        let guard = entry.lock().await;
        guard.session.form_data()
    };

    let document = match state.generator.generate(&template_id, &form_data).await {
        Ok(document) => document,
        Err(e) => {
            record_document("failed");
            return Err(e.into());
        }
    };
    record_document("generated");

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.filename),
        ),
    ];
    Ok((headers, document.bytes))
}

#[derive(Debug, Serialize)]
pub struct EncodedDocument {
    pub template_id: String,
    pub template_name: String,
    pub filename: String,
    pub filled_fields: Vec<String>,
    pub content_base64: String,
}

#[derive(Debug, Serialize)]
pub struct BatchFailure {
    pub template_id: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub scenario_id: String,
    pub documents: Vec<EncodedDocument>,
    pub errors: Vec<BatchFailure>,
}

/// Fill every template the session's scenario needs
pub async fn generate_scenario_documents(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<BatchResponse>, ServerError> {
    let (scenario_id, required_documents, form_data) = {
        let entry = state.sessions.get(&session_id)?;
        let guard = entry.lock().await;
        let scenario_id = guard
            .session
            .scenario()
            .map(|s| s.id.clone())
            .ok_or_else(|| ServerError::InvalidRequest("no scenario selected".to_string()))?;
        (
            scenario_id,
            guard.session.required_documents(),
            guard.session.form_data(),
        )
    };

    let template_ids: Vec<String> = state
        .generator
        .templates_for_scenario(&scenario_id, &required_documents)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    let mut response = BatchResponse {
        scenario_id,
        documents: Vec::new(),
        errors: Vec::new(),
    };
    for item in state.generator.generate_batch(&template_ids, &form_data).await {
        match item.result {
            Ok(document) => {
                record_document("generated");
                response.documents.push(EncodedDocument {
                    content_base64: BASE64.encode(&document.bytes),
                    template_id: document.template_id,
                    template_name: document.template_name,
                    filename: document.filename,
                    filled_fields: document.filled_fields,
                });
            }
            Err(e) => {
                record_document("failed");
                response.errors.push(BatchFailure {
                    template_id: item.template_id,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        session_id = %session_id,
        generated = response.documents.len(),
        failed = response.errors.len(),
        "Scenario documents generated"
    );
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("delivery.pdf").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("a/b.pdf").is_err());
    }
}
