use dealer_assist_persistence::PersistenceError;
use thiserror::Error;

/// Document generation errors
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template file unavailable: {0}")]
    FileUnavailable(String),

    #[error("Could not parse PDF: {0}")]
    Parse(String),

    #[error("Could not write PDF: {0}")]
    Write(String),

    #[error("Storage error: {0}")]
    Persistence(#[from] PersistenceError),
}
