//! Document catalog
//!
//! The dealership paperwork a scenario can require. Uploaded templates link to a
//! catalog entry through `DocumentTemplate::document_id`.

use dealer_assist_core::FieldCategory;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDefinition {
    pub id: String,
    pub name: String,
    /// Record categories the document draws from
    #[serde(default)]
    pub sections: Vec<FieldCategory>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentsConfig {
    #[serde(default)]
    pub documents: Vec<DocumentDefinition>,
}

impl DocumentsConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_yaml_str(&content)
    }

    pub fn get(&self, id: &str) -> Option<&DocumentDefinition> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn all(&self) -> &[DocumentDefinition] {
        &self.documents
    }
}
