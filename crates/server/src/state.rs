//! Application state
//!
//! Shared across all handlers.

use dealer_assist_config::{DealerDomainConfig, Settings};
use dealer_assist_core::{ChatModel, FieldCategory, TemplateAnalyzer};
use dealer_assist_documents::DocumentGenerator;
use dealer_assist_persistence::PersistenceLayer;
use std::sync::Arc;
use std::time::Duration;

use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub domain: Arc<DealerDomainConfig>,
    pub sessions: Arc<SessionManager>,
    pub chat_model: Arc<dyn ChatModel>,
    pub analyzer: Arc<dyn TemplateAnalyzer>,
    pub persistence: PersistenceLayer,
    pub generator: Arc<DocumentGenerator>,
}

impl AppState {
    pub fn new(
        config: Settings,
        domain: Arc<DealerDomainConfig>,
        chat_model: Arc<dyn ChatModel>,
        analyzer: Arc<dyn TemplateAnalyzer>,
        persistence: PersistenceLayer,
    ) -> Self {
        let sessions = SessionManager::new(domain.clone(), config.session.max_sessions)
            .with_rng_seed(config.session.rng_seed)
            .with_timeouts(
                Duration::from_secs(config.session.idle_timeout_seconds),
                Duration::from_secs(config.session.cleanup_interval_seconds),
            );
        let generator = DocumentGenerator::new(
            domain.clone(),
            persistence.templates.clone(),
            persistence.files.clone(),
        );

        Self {
            config: Arc::new(config),
            domain,
            sessions: Arc::new(sessions),
            chat_model,
            analyzer,
            persistence,
            generator: Arc::new(generator),
        }
    }
}

/// Flattened data keys a template field may be mapped to
pub fn known_data_keys(domain: &DealerDomainConfig) -> Vec<String> {
    let mut keys = Vec::new();
    for category in FieldCategory::ALL {
        for key in domain.mappings.category(category).keys() {
            let flattened = category.prefixed(key);
            if !keys.contains(&flattened) {
                keys.push(flattened);
            }
        }
    }
    keys
}
