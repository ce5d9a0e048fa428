//! LLM integration for the sales assistant
//!
//! Features:
//! - OpenAI-compatible chat completion backend
//! - Adapter exposing any backend as the core `ChatModel`
//! - System instruction construction for sales conversations
//! - Template analysis that asks the model for a form-field list

pub mod adapter;
pub mod analyzer;
pub mod backend;
pub mod prompt;

pub use adapter::ChatModelAdapter;
pub use analyzer::{parse_field_analysis, LlmTemplateAnalyzer};
pub use backend::{GenerationResult, LlmBackend, OpenAIBackend, OpenAIConfig};
pub use prompt::{PromptBuilder, PromptContext};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for dealer_assist_core::Error {
    fn from(err: LlmError) -> Self {
        dealer_assist_core::Error::Llm(err.to_string())
    }
}
