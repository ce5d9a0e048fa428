//! Prompt construction for sales conversations
//!
//! The system instructions carry the live deal context (scenario, stage, missing
//! fields) plus the tag format the reply parser understands.

use dealer_assist_core::{ChatMessage, ChatRequest, ConversationStage, Message, Role, TechniqueKind};

/// Deal context rendered into the system instructions
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    /// Active scenario id, if one was selected
    pub scenario_id: Option<String>,
    pub stage: ConversationStage,
    /// Display names of required fields still missing
    pub missing_fields: Vec<String>,
    /// Flattened keys worth capturing first
    pub priority_keys: Vec<String>,
    pub agreement_count: usize,
    /// Agreements needed before presentation switches to the yes-ladder
    pub yes_ladder_min_agreements: usize,
}

impl PromptContext {
    /// Technique the model should name in its suggestion tag
    pub fn technique_hint(&self) -> TechniqueKind {
        match self.stage {
            ConversationStage::HandlingObjections => TechniqueKind::WhatIf,
            ConversationStage::Closing => TechniqueKind::GiftLetter,
            ConversationStage::Presentation
                if self.agreement_count >= self.yes_ladder_min_agreements =>
            {
                TechniqueKind::YesLadder
            }
            _ => TechniqueKind::General,
        }
    }
}

/// Prompt builder for the dealership assistant
#[derive(Debug, Default)]
pub struct PromptBuilder {
    system: String,
    messages: Vec<Message>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the system instructions for a deal context
    pub fn system_prompt(mut self, context: &PromptContext) -> Self {
        let missing = if context.missing_fields.is_empty() {
            "None".to_string()
        } else {
            context.missing_fields.join(", ")
        };

        let mut system = format!(
            r#"You are a car sales assistant AI helping a car salesperson interact with customers.
Current sales scenario: {scenario}
Current conversation stage: {stage}
Missing required fields: {missing}

Your task is to help the salesperson by:
1. Suggesting appropriate sales techniques
2. Extracting customer information from the conversation
3. Providing helpful responses to move the sale forward

When you identify customer information like names, addresses, phone numbers, etc., format it as:
<field name="firstName">John</field>
<field name="address">123 Main St</field>

Vehicle details use the vehicle_ prefix, trade-in details tradeIn_, and lender details lender_:
<field name="vehicle_make">Toyota</field>
<field name="tradeIn_miles">45000</field>
<field name="lender_name">ABC Financial</field>

Place all field tags at the very end of your response.

When suggesting sales techniques, format them as:
<sales_suggestion>Try using the "{technique}" technique to address their concern</sales_suggestion>

Assess the conversation stage and recommend moving to the next stage when appropriate."#,
            scenario = context.scenario_id.as_deref().unwrap_or("Not selected"),
            stage = context.stage.prompt_label(),
            missing = missing,
            technique = context.technique_hint().tag(),
        );

        if !context.priority_keys.is_empty() {
            system.push_str("\n\nPrioritize capturing: ");
            system.push_str(&context.priority_keys.join(", "));
        }

        self.system = system;
        self
    }

    /// Append conversation history; system entries are dropped
    pub fn with_history(mut self, history: &[ChatMessage]) -> Self {
        self.messages.extend(
            history
                .iter()
                .filter(|m| m.role != Role::System)
                .map(ChatMessage::to_message),
        );
        self
    }

    pub fn user_message(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    pub fn build(self) -> ChatRequest {
        ChatRequest {
            system: self.system,
            messages: self.messages,
        }
    }
}
