//! Conversation types including stages, messages and technique suggestions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stages of a dealership sales conversation, in progression order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    /// Greeting and rapport building
    #[default]
    Introduction,
    /// Learning what the customer needs
    NeedsAssessment,
    /// Presenting vehicles against those needs
    Presentation,
    /// Working through concerns
    HandlingObjections,
    /// Asking for the decision
    Closing,
    /// Wrap-up after the decision
    FollowUp,
}

impl ConversationStage {
    /// All stages in progression order
    pub const ALL: [ConversationStage; 6] = [
        ConversationStage::Introduction,
        ConversationStage::NeedsAssessment,
        ConversationStage::Presentation,
        ConversationStage::HandlingObjections,
        ConversationStage::Closing,
        ConversationStage::FollowUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStage::Introduction => "introduction",
            ConversationStage::NeedsAssessment => "needs_assessment",
            ConversationStage::Presentation => "presentation",
            ConversationStage::HandlingObjections => "handling_objections",
            ConversationStage::Closing => "closing",
            ConversationStage::FollowUp => "follow_up",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ConversationStage::Introduction => "Introduction",
            ConversationStage::NeedsAssessment => "Needs Assessment",
            ConversationStage::Presentation => "Presentation",
            ConversationStage::HandlingObjections => "Handling Objections",
            ConversationStage::Closing => "Closing",
            ConversationStage::FollowUp => "Follow-up",
        }
    }

    /// Upper-case label used in model instructions
    pub fn prompt_label(&self) -> String {
        self.as_str().to_uppercase()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationStage::FollowUp)
    }
}

impl std::fmt::Display for ConversationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for ConversationStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        ConversationStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| format!("unknown conversation stage: {}", s))
    }
}

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Role-tagged text sent across the chat model boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Sales technique family behind a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechniqueKind {
    WhatIf,
    YesLadder,
    GiftLetter,
    General,
}

impl TechniqueKind {
    /// Short tag shown next to a suggestion
    pub fn tag(&self) -> &'static str {
        match self {
            TechniqueKind::WhatIf => "What if",
            TechniqueKind::YesLadder => "Yes ladder",
            TechniqueKind::GiftLetter => "Gift letter",
            TechniqueKind::General => "General",
        }
    }
}

/// Suggested phrase plus the technique it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechniqueSuggestion {
    pub kind: TechniqueKind,
    /// Human-readable technique description
    pub technique: String,
    pub suggestion: String,
}

/// A message in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_fields: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<TechniqueSuggestion>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            extracted_fields: None,
            suggestion: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, String>) -> Self {
        if !fields.is_empty() {
            self.extracted_fields = Some(fields);
        }
        self
    }

    pub fn with_suggestion(mut self, suggestion: TechniqueSuggestion) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    /// Strip metadata for the chat model boundary
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_ordering() {
        let mut sorted = ConversationStage::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, ConversationStage::ALL.to_vec());
        assert!(ConversationStage::Introduction < ConversationStage::FollowUp);
    }

    #[test]
    fn test_stage_parse() {
        assert_eq!(
            "needs assessment".parse::<ConversationStage>().unwrap(),
            ConversationStage::NeedsAssessment
        );
        assert_eq!(
            "HANDLING_OBJECTIONS".parse::<ConversationStage>().unwrap(),
            ConversationStage::HandlingObjections
        );
        assert!("haggling".parse::<ConversationStage>().is_err());
    }

    #[test]
    fn test_prompt_label() {
        assert_eq!(ConversationStage::FollowUp.prompt_label(), "FOLLOW_UP");
    }

    #[test]
    fn test_empty_fields_not_attached() {
        let msg = ChatMessage::new(Role::Assistant, "hi").with_fields(BTreeMap::new());
        assert!(msg.extracted_fields.is_none());
    }
}
