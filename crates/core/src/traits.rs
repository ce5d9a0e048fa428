//! Boundary traits for external services
//!
//! - `ChatModel`: the chat completion service. It takes role-tagged history plus
//!   system instructions and returns one text blob that may carry field tags.
//! - `TemplateAnalyzer`: discovers the fillable fields of an uploaded template.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::conversation::Message;
use crate::error::Result;
use crate::template::FormFieldSet;

/// One chat completion request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// System instructions
    pub system: String,
    /// Conversation history, oldest first
    pub messages: Vec<Message>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the assistant reply for the request
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Template reference handed to an analyzer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub template_id: String,
    pub name: String,
    pub filename: String,
    /// Form field names read from the PDF itself, if any
    #[serde(default)]
    pub form_field_names: Vec<String>,
}

#[async_trait]
pub trait TemplateAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<FormFieldSet>;
}
