//! Sales playbook
//!
//! Vocabulary and canned phrases behind technique selection and stage
//! progression. Lists are ordered; rebuttals are matched first-keyword-wins.

use dealer_assist_core::ConversationStage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::ConfigError;

/// General guidance for a stage when no specific technique applies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageGuidance {
    pub technique: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rebuttal {
    pub keyword: String,
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfConfig {
    pub technique: String,
    #[serde(default)]
    pub rebuttals: Vec<Rebuttal>,
    pub fallback: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YesLadderConfig {
    pub technique: String,
    /// Agreements needed before presentation switches to the ladder
    #[serde(default = "default_ladder_threshold")]
    pub min_agreements: usize,
    pub base: Vec<String>,
    #[serde(default)]
    pub advanced: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftLetterConfig {
    pub technique: String,
    #[serde(default = "default_gift_threshold")]
    pub min_agreements: usize,
    pub phrases: Vec<String>,
}

fn default_ladder_threshold() -> usize {
    2
}

fn default_gift_threshold() -> usize {
    4
}

/// Message-count thresholds and keyword triggers for stage changes.
///
/// Counts are the number of messages in the history before the current user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTriggers {
    #[serde(default = "default_needs_assessment_after")]
    pub needs_assessment_after: usize,
    #[serde(default = "default_presentation_after")]
    pub presentation_after: usize,
    #[serde(default = "default_objections_after")]
    pub objections_after: usize,
    #[serde(default = "default_closing_after")]
    pub closing_after: usize,
    #[serde(default = "default_follow_up_after")]
    pub follow_up_after: usize,
    #[serde(default)]
    pub objection_words: Vec<String>,
    #[serde(default)]
    pub resolution_words: Vec<String>,
    #[serde(default)]
    pub commitment_words: Vec<String>,
}

fn default_needs_assessment_after() -> usize {
    4
}
fn default_presentation_after() -> usize {
    8
}
fn default_objections_after() -> usize {
    12
}
fn default_closing_after() -> usize {
    16
}
fn default_follow_up_after() -> usize {
    20
}

impl Default for StageTriggers {
    fn default() -> Self {
        Self {
            needs_assessment_after: default_needs_assessment_after(),
            presentation_after: default_presentation_after(),
            objections_after: default_objections_after(),
            closing_after: default_closing_after(),
            follow_up_after: default_follow_up_after(),
            objection_words: Vec::new(),
            resolution_words: Vec::new(),
            commitment_words: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesPlaybook {
    /// Opening assistant message of every session
    pub greeting: String,
    pub objection_keywords: Vec<String>,
    pub agreement_keywords: Vec<String>,
    #[serde(default = "default_snippet_chars")]
    pub agreement_snippet_chars: usize,
    pub guidance: HashMap<ConversationStage, StageGuidance>,
    pub what_if: WhatIfConfig,
    pub yes_ladder: YesLadderConfig,
    pub gift_letter: GiftLetterConfig,
    #[serde(default)]
    pub stage_triggers: StageTriggers,
}

fn default_snippet_chars() -> usize {
    20
}

impl SalesPlaybook {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_yaml_str(&content)
    }

    pub fn guidance_for(&self, stage: ConversationStage) -> Option<&StageGuidance> {
        self.guidance.get(&stage)
    }
}

/// Case-insensitive substring match against a vocabulary
pub fn contains_any<S: AsRef<str>>(text: &str, words: &[S]) -> bool {
    let lower = text.to_lowercase();
    words
        .iter()
        .any(|w| lower.contains(&w.as_ref().to_lowercase()))
}
