//! Chat model adapter
//!
//! Bridges the LlmBackend trait to the core ChatModel trait. The request's system
//! instructions become the leading system message.

use async_trait::async_trait;
use dealer_assist_core::{ChatModel, ChatRequest, Message, Result};
use std::sync::Arc;

use crate::backend::LlmBackend;

pub struct ChatModelAdapter {
    backend: Arc<dyn LlmBackend>,
    model_name: String,
}

impl ChatModelAdapter {
    pub fn new<B: LlmBackend + 'static>(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn LlmBackend>) -> Self {
        let model_name = backend.model_name().to_string();
        Self {
            backend,
            model_name,
        }
    }

    fn to_messages(request: &ChatRequest) -> Vec<Message> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(Message::system(request.system.clone()));
        }
        messages.extend(request.messages.iter().cloned());
        messages
    }
}

#[async_trait]
impl ChatModel for ChatModelAdapter {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let messages = Self::to_messages(request);
        let result = self.backend.generate(&messages).await?;
        Ok(result.text)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
