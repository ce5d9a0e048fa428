//! Persistence layer for the dealership sales assistant
//!
//! Provides storage for:
//! - Customers (deal records saved from sessions)
//! - PDF template metadata, including analysed form fields
//! - PDF template bytes
//!
//! Each store has an in-memory implementation; customers and templates can
//! also live in ScyllaDB, template files in a local directory.

pub mod client;
pub mod customers;
pub mod error;
pub mod schema;
pub mod templates;

pub use client::{ScyllaClient, ScyllaConfig};
pub use customers::{CustomerEntry, CustomerStore, InMemoryCustomerStore, ScyllaCustomerStore};
pub use error::PersistenceError;
pub use templates::{
    InMemoryFileStore, InMemoryTemplateStore, LocalFileStore, ScyllaTemplateStore,
    TemplateFileStore, TemplateStore,
};

use dealer_assist_config::PersistenceConfig;
use std::sync::Arc;

/// Combined persistence layer
#[derive(Clone)]
pub struct PersistenceLayer {
    pub customers: Arc<dyn CustomerStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub files: Arc<dyn TemplateFileStore>,
}

impl PersistenceLayer {
    /// Everything in process memory
    pub fn in_memory() -> Self {
        Self {
            customers: Arc::new(InMemoryCustomerStore::new()),
            templates: Arc::new(InMemoryTemplateStore::new()),
            files: Arc::new(InMemoryFileStore::new()),
        }
    }
}

/// Initialize persistence from settings.
///
/// ScyllaDB is only contacted when enabled; template files go to `template_dir`
/// when set.
pub async fn init(config: &PersistenceConfig) -> Result<PersistenceLayer, PersistenceError> {
    let files: Arc<dyn TemplateFileStore> = match &config.template_dir {
        Some(dir) => Arc::new(LocalFileStore::new(dir).await?),
        None => Arc::new(InMemoryFileStore::new()),
    };

    if !config.enabled {
        tracing::info!("ScyllaDB persistence disabled, using in-memory stores");
        return Ok(PersistenceLayer {
            files,
            ..PersistenceLayer::in_memory()
        });
    }

    let client = ScyllaClient::connect(ScyllaConfig::from(config)).await?;
    client.ensure_schema().await?;

    Ok(PersistenceLayer {
        customers: Arc::new(ScyllaCustomerStore::new(client.clone())),
        templates: Arc::new(ScyllaTemplateStore::new(client)),
        files,
    })
}
