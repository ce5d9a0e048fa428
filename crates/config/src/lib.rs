//! Configuration management for the dealership sales assistant
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default`, `config/{env}`)
//! - Environment variables (DEALER_ASSIST_ prefix, `__` separator)
//!
//! # Domain Configuration
//!
//! The dealership catalog lives in config/domains/dealership/:
//! - fields.yaml - field registry (requiredness, validation, per-document names)
//! - scenarios.yaml - sales scenarios and their required documents
//! - documents.yaml - document catalog
//! - mappings.yaml - default form-field locations per category
//! - playbook.yaml - sales technique vocabulary and phrases
//!
//! The same files are embedded at compile time, so a catalog is always available.

pub mod domain;
pub mod settings;

pub use domain::{
    DealerDomainConfig, DocumentDefinition, DocumentsConfig, DomainValidator, ExtractionPriority,
    FieldDefinition, FieldMappingsConfig, FieldRegistry, MappingEntry, Rebuttal, Requirement,
    SalesPlaybook, ScenarioDefinition, ScenariosConfig, StageGuidance, StageTriggers,
    ValidationIssue, ValidationReport, ValidationSeverity,
};
pub use settings::{
    load_settings, LlmConfig, ObservabilityConfig, PersistenceConfig, RuntimeEnvironment,
    ServerConfig, SessionConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Domain validation failed: {0}")]
    Validation(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
