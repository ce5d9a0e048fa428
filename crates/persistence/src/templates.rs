//! Template metadata and file storage

use crate::customers::millis_to_datetime;
use crate::{PersistenceError, ScyllaClient};
use async_trait::async_trait;
use chrono::Utc;
use dealer_assist_core::{DocumentTemplate, FormFieldSet};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Insert or replace by id
    async fn save(&self, template: &DocumentTemplate) -> Result<(), PersistenceError>;
    async fn get(&self, id: &str) -> Result<Option<DocumentTemplate>, PersistenceError>;
    /// Ordered by name
    async fn list(&self) -> Result<Vec<DocumentTemplate>, PersistenceError>;
    /// Replace the analysed field structure
    async fn set_form_fields(
        &self,
        id: &str,
        fields: &FormFieldSet,
    ) -> Result<(), PersistenceError>;
    async fn delete(&self, id: &str) -> Result<bool, PersistenceError>;
}

/// Storage for uploaded PDF bytes, keyed by template storage key
#[async_trait]
pub trait TemplateFileStore: Send + Sync {
    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<(), PersistenceError>;
    async fn get(&self, filename: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
    async fn delete(&self, filename: &str) -> Result<(), PersistenceError>;
}

#[derive(Default)]
pub struct InMemoryTemplateStore {
    templates: RwLock<HashMap<String, DocumentTemplate>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn save(&self, template: &DocumentTemplate) -> Result<(), PersistenceError> {
        self.templates
            .write()
            .insert(template.id.clone(), template.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<DocumentTemplate>, PersistenceError> {
        Ok(self.templates.read().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<DocumentTemplate>, PersistenceError> {
        let mut templates: Vec<_> = self.templates.read().values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn set_form_fields(
        &self,
        id: &str,
        fields: &FormFieldSet,
    ) -> Result<(), PersistenceError> {
        let mut templates = self.templates.write();
        let template = templates
            .get_mut(id)
            .ok_or_else(|| PersistenceError::NotFound(format!("template {id}")))?;
        template.form_fields = Some(fields.clone());
        template.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, PersistenceError> {
        Ok(self.templates.write().remove(id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryFileStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateFileStore for InMemoryFileStore {
    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.files.write().insert(filename.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, filename: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.files.read().get(filename).cloned())
    }

    async fn delete(&self, filename: &str) -> Result<(), PersistenceError> {
        self.files.write().remove(filename);
        Ok(())
    }
}

/// Template files in a local directory
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Resolve a filename inside the root; path separators are rejected
    fn path_for(&self, filename: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\']);
        if !valid {
            return Err(PersistenceError::InvalidData(format!(
                "invalid template filename: {filename}"
            )));
        }
        Ok(self.root.join(filename))
    }
}

#[async_trait]
impl TemplateFileStore for LocalFileStore {
    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        let path = self.path_for(filename)?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Template file written");
        Ok(())
    }

    async fn get(&self, filename: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let path = self.path_for(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, filename: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct ScyllaTemplateStore {
    client: ScyllaClient,
}

type TemplateRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
    i64,
);

const TEMPLATE_COLUMNS: &str = "id, name, filename, category, description, document_id, \
                                required_scenarios_json, form_fields_json, created_at, updated_at";

impl ScyllaTemplateStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    fn row_to_template(
        &self,
        row: scylla::frame::response::result::Row,
    ) -> Result<DocumentTemplate, PersistenceError> {
        let (
            id,
            name,
            filename,
            category,
            description,
            document_id,
            scenarios_json,
            fields_json,
            created_at,
            updated_at,
        ): TemplateRow = row
            .into_typed()
            .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        let required_scenarios = match scenarios_json {
            Some(json) if !json.is_empty() => serde_json::from_str(&json)?,
            _ => Vec::new(),
        };
        let form_fields = match fields_json {
            Some(json) if !json.is_empty() => Some(serde_json::from_str(&json)?),
            _ => None,
        };

        Ok(DocumentTemplate {
            id,
            name,
            filename,
            category,
            description,
            document_id,
            form_fields,
            required_scenarios,
            created_at: millis_to_datetime(created_at),
            updated_at: millis_to_datetime(updated_at),
        })
    }
}

#[async_trait]
impl TemplateStore for ScyllaTemplateStore {
    async fn save(&self, template: &DocumentTemplate) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.pdf_templates ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace(),
            TEMPLATE_COLUMNS
        );
        let form_fields = template
            .form_fields
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &template.id,
                    &template.name,
                    &template.filename,
                    &template.category,
                    &template.description,
                    &template.document_id,
                    serde_json::to_string(&template.required_scenarios)?,
                    form_fields,
                    template.created_at.timestamp_millis(),
                    template.updated_at.timestamp_millis(),
                ),
            )
            .await?;

        tracing::info!(template_id = %template.id, name = %template.name, "Template saved to ScyllaDB");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<DocumentTemplate>, PersistenceError> {
        let query = format!(
            "SELECT {} FROM {}.pdf_templates WHERE id = ?",
            TEMPLATE_COLUMNS,
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (id,)).await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                return Ok(Some(self.row_to_template(row)?));
            }
        }
        Ok(None)
    }

    async fn list(&self) -> Result<Vec<DocumentTemplate>, PersistenceError> {
        let query = format!(
            "SELECT {} FROM {}.pdf_templates",
            TEMPLATE_COLUMNS,
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, &[]).await?;

        let mut templates = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                templates.push(self.row_to_template(row)?);
            }
        }
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn set_form_fields(
        &self,
        id: &str,
        fields: &FormFieldSet,
    ) -> Result<(), PersistenceError> {
        if self.get(id).await?.is_none() {
            return Err(PersistenceError::NotFound(format!("template {id}")));
        }

        let query = format!(
            "UPDATE {}.pdf_templates SET form_fields_json = ?, updated_at = ? WHERE id = ?",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    serde_json::to_string(fields)?,
                    Utc::now().timestamp_millis(),
                    id,
                ),
            )
            .await?;

        tracing::info!(template_id = %id, fields = fields.fields.len(), "Template fields updated");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, PersistenceError> {
        let existed = self.get(id).await?.is_some();
        let query = format!(
            "DELETE FROM {}.pdf_templates WHERE id = ?",
            self.client.keyspace()
        );
        self.client.session().query_unpaged(query, (id,)).await?;
        Ok(existed)
    }
}
