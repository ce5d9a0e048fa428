//! Domain catalog validator
//!
//! Cross-checks the catalog files at startup:
//! - scenarios only reference documents that exist
//! - field document mappings name catalog documents
//! - field record keys resolve to real record attributes
//! - scenario ids agree with their declared trade-in status
//! - playbook lists needed at runtime are non-empty

use dealer_assist_core::{DealRecord, ScenarioFeatures};
use std::collections::HashSet;

use super::DealerDomainConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Warning,
    Error,
    /// Prevents startup
    Critical,
}

#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    /// Catalog file the issue was found in
    pub source: String,
    pub item: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let item = self.item.as_deref().unwrap_or("(root)");
        write!(
            f,
            "[{:?}] {}/{}: {}",
            self.severity, self.source, item, self.message
        )
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn push(&mut self, severity: ValidationSeverity, source: &str, item: Option<&str>, message: String) {
        self.issues.push(ValidationIssue {
            severity,
            source: source.to_string(),
            item: item.map(str::to_string),
            message,
        });
    }

    /// No critical issues
    pub fn is_ok(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Critical)
    }

    pub fn critical_issues(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Critical)
            .collect()
    }

    pub fn summary(&self) -> String {
        let count = |s| self.issues.iter().filter(|i| i.severity == s).count();
        if self.issues.is_empty() {
            "Domain catalog: all validations passed".to_string()
        } else {
            format!(
                "Domain catalog: {} critical, {} errors, {} warnings",
                count(ValidationSeverity::Critical),
                count(ValidationSeverity::Error),
                count(ValidationSeverity::Warning)
            )
        }
    }
}

#[derive(Debug, Default)]
pub struct DomainValidator;

impl DomainValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, config: &DealerDomainConfig) -> ValidationReport {
        let mut report = ValidationReport::default();
        self.validate_fields(config, &mut report);
        self.validate_scenarios(config, &mut report);
        self.validate_playbook(config, &mut report);
        report
    }

    fn validate_fields(&self, config: &DealerDomainConfig, report: &mut ValidationReport) {
        if config.fields.is_empty() {
            report.push(
                ValidationSeverity::Critical,
                "fields.yaml",
                None,
                "Field registry is empty".to_string(),
            );
        }

        for field in config.fields.all() {
            for document_id in field.document_mapping.keys() {
                if !config.documents.contains(document_id) {
                    report.push(
                        ValidationSeverity::Error,
                        "fields.yaml",
                        Some(&field.id),
                        format!("Maps to unknown document '{}'", document_id),
                    );
                }
            }

            if let Some(key) = &field.record_key {
                if !DealRecord::has_attribute(field.category, key) {
                    report.push(
                        ValidationSeverity::Error,
                        "fields.yaml",
                        Some(&field.id),
                        format!("'{}' is not a {} attribute", key, field.category),
                    );
                }
            }
        }
    }

    fn validate_scenarios(&self, config: &DealerDomainConfig, report: &mut ValidationReport) {
        let mut seen = HashSet::new();
        let mut used_documents = HashSet::new();

        for scenario in config.scenarios.all() {
            if !seen.insert(scenario.id.as_str()) {
                report.push(
                    ValidationSeverity::Critical,
                    "scenarios.yaml",
                    Some(&scenario.id),
                    "Duplicate scenario id".to_string(),
                );
            }

            for document_id in &scenario.required_documents {
                used_documents.insert(document_id.as_str());
                if !config.documents.contains(document_id) {
                    report.push(
                        ValidationSeverity::Critical,
                        "scenarios.yaml",
                        Some(&scenario.id),
                        format!("Requires unknown document '{}'", document_id),
                    );
                }
            }

            if ScenarioFeatures::infer_from_id(&scenario.id) != scenario.features() {
                report.push(
                    ValidationSeverity::Warning,
                    "scenarios.yaml",
                    Some(&scenario.id),
                    format!(
                        "Declared trade_in '{:?}' disagrees with the scenario id",
                        scenario.trade_in
                    ),
                );
            }
        }

        for document in config.documents.all() {
            if !config.scenarios.all().is_empty() && !used_documents.contains(document.id.as_str()) {
                report.push(
                    ValidationSeverity::Warning,
                    "documents.yaml",
                    Some(&document.id),
                    "Not required by any scenario".to_string(),
                );
            }
        }
    }

    fn validate_playbook(&self, config: &DealerDomainConfig, report: &mut ValidationReport) {
        let playbook = &config.playbook;

        if playbook.yes_ladder.base.is_empty() {
            report.push(
                ValidationSeverity::Critical,
                "playbook.yaml",
                Some("yes_ladder.base"),
                "Yes-ladder question list is empty".to_string(),
            );
        }
        if playbook.gift_letter.phrases.is_empty() {
            report.push(
                ValidationSeverity::Critical,
                "playbook.yaml",
                Some("gift_letter.phrases"),
                "Gift phrase list is empty".to_string(),
            );
        }
        if playbook.agreement_keywords.is_empty() {
            report.push(
                ValidationSeverity::Warning,
                "playbook.yaml",
                Some("agreement_keywords"),
                "Agreement counter will never advance".to_string(),
            );
        }
        if playbook.agreement_snippet_chars == 0 {
            report.push(
                ValidationSeverity::Warning,
                "playbook.yaml",
                Some("agreement_snippet_chars"),
                "Agreement log snippets will be empty".to_string(),
            );
        }
    }
}
