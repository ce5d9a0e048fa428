//! Dealership sales assistant server
//!
//! HTTP API over sales sessions, the domain catalog, PDF templates and
//! document generation.

pub mod documents;
pub mod http;
pub mod metrics;
pub mod session;
pub mod state;

pub use http::create_router;
pub use crate::metrics::{init_metrics, metrics_handler};
pub use session::{ManagedSession, SessionManager};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dealer_assist_agent::AgentError;
use dealer_assist_documents::DocumentError;
use dealer_assist_persistence::PersistenceError;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Session limit reached")]
    SessionLimit,

    /// Chat model, analyzer or storage failure
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::SessionNotFound(_) | ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::SessionLimit => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ServerError::SessionNotFound(_) => "session_not_found",
            ServerError::NotFound(_) => "not_found",
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::SessionLimit => "session_limit",
            ServerError::Upstream(_) => "upstream",
            ServerError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "Request failed");
        }
        crate::metrics::record_error(self.kind());
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<AgentError> for ServerError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::EmptyMessage => ServerError::InvalidRequest(err.to_string()),
            AgentError::Model(e) => ServerError::Upstream(e.to_string()),
        }
    }
}

impl From<PersistenceError> for ServerError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(what) => ServerError::NotFound(what),
            PersistenceError::InvalidData(msg) => ServerError::InvalidRequest(msg),
            other => ServerError::Upstream(other.to_string()),
        }
    }
}

impl From<DocumentError> for ServerError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::TemplateNotFound(_) | DocumentError::FileUnavailable(_) => {
                ServerError::NotFound(err.to_string())
            }
            DocumentError::Parse(_) | DocumentError::Write(_) => {
                ServerError::Internal(err.to_string())
            }
            DocumentError::Persistence(e) => e.into(),
        }
    }
}

impl From<dealer_assist_core::Error> for ServerError {
    fn from(err: dealer_assist_core::Error) -> Self {
        match err {
            dealer_assist_core::Error::InvalidInput(msg) => ServerError::InvalidRequest(msg),
            dealer_assist_core::Error::NotFound(what) => ServerError::NotFound(what),
            other => ServerError::Upstream(other.to_string()),
        }
    }
}
