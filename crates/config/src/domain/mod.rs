//! Dealership domain catalog
//!
//! Bundles the field registry, scenarios, documents, default mapping table and
//! sales playbook. Files in a configured directory override the embedded copies
//! one by one, and the combined catalog is validated before use.

mod documents;
mod fields;
mod mappings;
mod playbook;
mod scenarios;
mod validator;

pub use documents::{DocumentDefinition, DocumentsConfig};
pub use fields::{FieldDefinition, FieldRegistry, Requirement};
pub use mappings::{ExtractionPriority, FieldMappingsConfig, MappingEntry};
pub use playbook::{
    contains_any, GiftLetterConfig, Rebuttal, SalesPlaybook, StageGuidance, StageTriggers,
    WhatIfConfig, YesLadderConfig,
};
pub use scenarios::{ScenarioDefinition, ScenariosConfig};
pub use validator::{DomainValidator, ValidationIssue, ValidationReport, ValidationSeverity};

use std::path::Path;

use crate::ConfigError;

const FIELDS_YAML: &str = include_str!("../../../../config/domains/dealership/fields.yaml");
const SCENARIOS_YAML: &str = include_str!("../../../../config/domains/dealership/scenarios.yaml");
const DOCUMENTS_YAML: &str = include_str!("../../../../config/domains/dealership/documents.yaml");
const MAPPINGS_YAML: &str = include_str!("../../../../config/domains/dealership/mappings.yaml");
const PLAYBOOK_YAML: &str = include_str!("../../../../config/domains/dealership/playbook.yaml");

/// Complete domain catalog
#[derive(Debug, Clone)]
pub struct DealerDomainConfig {
    pub fields: FieldRegistry,
    pub scenarios: ScenariosConfig,
    pub documents: DocumentsConfig,
    pub mappings: FieldMappingsConfig,
    pub playbook: SalesPlaybook,
}

impl DealerDomainConfig {
    /// Catalog compiled into the binary
    pub fn builtin() -> Result<Self, ConfigError> {
        let config = Self {
            fields: FieldRegistry::from_yaml_str(FIELDS_YAML)?,
            scenarios: ScenariosConfig::from_yaml_str(SCENARIOS_YAML)?,
            documents: DocumentsConfig::from_yaml_str(DOCUMENTS_YAML)?,
            mappings: FieldMappingsConfig::from_yaml_str(MAPPINGS_YAML)?,
            playbook: SalesPlaybook::from_yaml_str(PLAYBOOK_YAML)?,
        };
        config.ensure_valid()?;
        Ok(config)
    }

    /// Load from a directory, falling back to the embedded file for each one missing
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ConfigError::FileNotFound(dir.display().to_string()));
        }

        let config = Self {
            fields: FieldRegistry::from_yaml_str(&read_or_embedded(dir, "fields.yaml", FIELDS_YAML)?)?,
            scenarios: ScenariosConfig::from_yaml_str(&read_or_embedded(
                dir,
                "scenarios.yaml",
                SCENARIOS_YAML,
            )?)?,
            documents: DocumentsConfig::from_yaml_str(&read_or_embedded(
                dir,
                "documents.yaml",
                DOCUMENTS_YAML,
            )?)?,
            mappings: FieldMappingsConfig::from_yaml_str(&read_or_embedded(
                dir,
                "mappings.yaml",
                MAPPINGS_YAML,
            )?)?,
            playbook: SalesPlaybook::from_yaml_str(&read_or_embedded(
                dir,
                "playbook.yaml",
                PLAYBOOK_YAML,
            )?)?,
        };
        config.ensure_valid()?;
        tracing::info!(
            dir = %dir.display(),
            fields = config.fields.len(),
            scenarios = config.scenarios.all().len(),
            "Loaded domain catalog"
        );
        Ok(config)
    }

    /// Directory catalog when configured, builtin otherwise
    pub fn load(dir: Option<&str>) -> Result<Self, ConfigError> {
        match dir {
            Some(dir) => Self::load_from_dir(dir),
            None => Self::builtin(),
        }
    }

    pub fn validate(&self) -> ValidationReport {
        DomainValidator::new().validate(self)
    }

    fn ensure_valid(&self) -> Result<(), ConfigError> {
        let report = self.validate();
        for issue in &report.issues {
            if issue.severity < ValidationSeverity::Critical {
                tracing::warn!(%issue, "Domain catalog issue");
            }
        }
        if !report.is_ok() {
            let critical: Vec<String> = report
                .critical_issues()
                .iter()
                .map(|i| i.to_string())
                .collect();
            return Err(ConfigError::Validation(critical.join("; ")));
        }
        Ok(())
    }
}

fn read_or_embedded(dir: &Path, name: &str, embedded: &str) -> Result<String, ConfigError> {
    let path = dir.join(name);
    if path.exists() {
        std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::ParseError(format!("Failed to read {}: {}", path.display(), e)))
    } else {
        tracing::debug!(file = name, "Using embedded domain file");
        Ok(embedded.to_string())
    }
}
