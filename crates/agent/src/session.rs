//! Sales session
//!
//! Owns everything one conversation needs: history, stage, agreements, the
//! selected scenario and the deal record. State changes are published as
//! `SessionEvent`s for observers (UI streams, metrics).

use chrono::{DateTime, Utc};
use dealer_assist_config::{DealerDomainConfig, ExtractionPriority};
use dealer_assist_core::{
    ChatMessage, ChatModel, ConversationStage, DealRecord, Role, TechniqueSuggestion,
};
use dealer_assist_llm::{PromptBuilder, PromptContext};
use dealer_assist_text_processing::extract_structured;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::record::{AppliedFields, DealRecordStore};
use crate::scenario::{ActiveScenario, ScenarioResolver};
use crate::stage::{StageManager, StageTransition, TransitionReason};
use crate::technique::{AgreementTracker, TechniqueSelector};
use crate::AgentError;

/// Session events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ScenarioSelected { scenario_id: String, known: bool },
    FieldsUpdated { count: usize, keys: Vec<String> },
    AgreementRecorded { count: usize, topic: String },
    StageChanged { from: ConversationStage, to: ConversationStage },
    Error { message: String },
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Seed for gift-letter selection; entropy when unset
    pub rng_seed: Option<u64>,
}

/// Result of one user turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// Assistant reply with tags removed
    pub reply: String,
    /// Fields the model tagged, as extracted
    pub extracted_fields: BTreeMap<String, String>,
    pub applied: AppliedFields,
    /// Suggestion tag from the model reply, if any
    pub model_suggestion: Option<String>,
    pub technique: TechniqueSuggestion,
    pub stage: ConversationStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<StageTransition>,
    pub missing_fields: Vec<String>,
}

/// Snapshot of a session for display
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub scenario: Option<ActiveScenario>,
    pub stage: ConversationStage,
    pub agreement_count: usize,
    pub agreement_topics: Vec<String>,
    pub record: DealRecord,
    pub form_data: BTreeMap<String, String>,
    pub missing_fields: Vec<String>,
    pub required_documents: Vec<String>,
    /// Filled fields whose value does not match the expected format
    pub validation_warnings: Vec<String>,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
}

pub struct SalesSession {
    id: String,
    domain: Arc<DealerDomainConfig>,
    resolver: ScenarioResolver,
    selector: TechniqueSelector,
    stage: StageManager,
    agreements: AgreementTracker,
    records: DealRecordStore,
    scenario: Option<ActiveScenario>,
    messages: Vec<ChatMessage>,
    rng: StdRng,
    event_tx: broadcast::Sender<SessionEvent>,
    created_at: DateTime<Utc>,
}

impl SalesSession {
    /// Create a session seeded with the greeting
    pub fn new(id: impl Into<String>, domain: Arc<DealerDomainConfig>, options: SessionOptions) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let rng = match options.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let greeting = ChatMessage::new(Role::Assistant, domain.playbook.greeting.clone());

        Self {
            id: id.into(),
            resolver: ScenarioResolver::from_domain(&domain),
            selector: TechniqueSelector::from_domain(&domain),
            stage: StageManager::new(domain.playbook.stage_triggers.clone()),
            agreements: AgreementTracker::new(),
            records: DealRecordStore::from_domain(&domain),
            scenario: None,
            messages: vec![greeting],
            rng,
            event_tx,
            created_at: Utc::now(),
            domain,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is not an error
        let _ = self.event_tx.send(event);
    }

    pub fn stage(&self) -> ConversationStage {
        self.stage.current()
    }

    pub fn stage_history(&self) -> &[StageTransition] {
        self.stage.history()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn scenario(&self) -> Option<&ActiveScenario> {
        self.scenario.as_ref()
    }

    pub fn record(&self) -> &DealRecord {
        self.records.record()
    }

    pub fn agreement_count(&self) -> usize {
        self.agreements.count()
    }

    /// Select the sales scenario; unknown ids are accepted with inferred features
    pub fn select_scenario(&mut self, scenario_id: &str) -> &ActiveScenario {
        let active = self.resolver.resolve(scenario_id);
        tracing::info!(session_id = %self.id, scenario_id, known = active.is_known(), "Scenario selected");
        self.emit(SessionEvent::ScenarioSelected {
            scenario_id: active.id.clone(),
            known: active.is_known(),
        });
        self.scenario.insert(active)
    }

    /// Move the stage forward by hand
    pub fn set_stage(&mut self, stage: ConversationStage) -> Option<StageTransition> {
        let transition = self.stage.transition(stage, TransitionReason::Manual)?;
        self.emit(SessionEvent::StageChanged {
            from: transition.from,
            to: transition.to,
        });
        Some(transition)
    }

    /// Merge fields into the deal record
    pub fn apply_fields(&mut self, fields: &BTreeMap<String, String>) -> AppliedFields {
        let applied = self.records.apply_extracted_fields(fields);
        if applied.count() > 0 {
            self.emit(SessionEvent::FieldsUpdated {
                count: applied.count(),
                keys: applied.written.clone(),
            });
        }
        applied
    }

    pub fn missing_required_fields(&self) -> Vec<String> {
        self.records.missing_required_fields(self.scenario.as_ref())
    }

    pub fn required_documents(&self) -> Vec<String> {
        self.resolver
            .required_documents(self.scenario.as_ref().map(|s| s.id.as_str()))
    }

    /// Flattened record for document filling
    pub fn form_data(&self) -> BTreeMap<String, String> {
        self.records.form_data()
    }

    fn prompt_context(&self) -> PromptContext {
        let present = self.records.form_data();
        let priority_keys = self
            .domain
            .mappings
            .keys_with_priority(ExtractionPriority::High)
            .into_iter()
            .filter(|key| !present.contains_key(key))
            .collect();

        PromptContext {
            scenario_id: self.scenario.as_ref().map(|s| s.id.clone()),
            stage: self.stage.current(),
            missing_fields: self.missing_required_fields(),
            priority_keys,
            agreement_count: self.agreements.count(),
            yes_ladder_min_agreements: self.domain.playbook.yes_ladder.min_agreements,
        }
    }

    /// Process one salesperson/customer message.
    ///
    /// The user message stays in history even when the model call fails; in that
    /// case an `Error` event is published and neither the record nor the stage changes.
    pub async fn handle_user_message(
        &mut self,
        text: &str,
        model: &dyn ChatModel,
    ) -> Result<TurnOutcome, AgentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::EmptyMessage);
        }

        let count_before = self.messages.len();
        let stage = self.stage.current();
        let technique = self
            .selector
            .select(text, stage, self.agreements.count(), &mut self.rng);

        if self.selector.is_agreement(text) {
            let count = self.agreements.record(text, self.selector.snippet_chars());
            let topic = self.agreements.topics().last().cloned().unwrap_or_default();
            self.emit(SessionEvent::AgreementRecorded { count, topic });
        }

        let request = PromptBuilder::new()
            .system_prompt(&self.prompt_context())
            .with_history(&self.messages)
            .user_message(text)
            .build();
        self.messages.push(ChatMessage::new(Role::User, text));

        let raw = match model.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "Chat model call failed");
                self.emit(SessionEvent::Error {
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let extracted = extract_structured(&raw);
        let applied = self.apply_fields(&extracted.fields);

        self.messages.push(
            ChatMessage::new(Role::Assistant, extracted.clean_text.clone())
                .with_fields(extracted.fields.clone())
                .with_suggestion(technique.clone()),
        );

        let transition = self.stage.advance(count_before, text);
        if let Some(t) = &transition {
            tracing::info!(session_id = %self.id, from = ?t.from, to = ?t.to, "Conversation stage advanced");
            self.emit(SessionEvent::StageChanged {
                from: t.from,
                to: t.to,
            });
        }

        Ok(TurnOutcome {
            reply: extracted.clean_text,
            extracted_fields: extracted.fields,
            applied,
            model_suggestion: extracted.suggestion,
            technique,
            stage: self.stage.current(),
            transition,
            missing_fields: self.missing_required_fields(),
        })
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            scenario: self.scenario.clone(),
            stage: self.stage.current(),
            agreement_count: self.agreements.count(),
            agreement_topics: self.agreements.topics().to_vec(),
            record: self.records.record().clone(),
            form_data: self.records.form_data(),
            missing_fields: self.missing_required_fields(),
            required_documents: self.required_documents(),
            validation_warnings: self.records.validation_issues(),
            message_count: self.messages.len(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealer_assist_core::TechniqueKind;

    fn session() -> SalesSession {
        let domain = Arc::new(DealerDomainConfig::builtin().unwrap());
        SalesSession::new("s1", domain, SessionOptions { rng_seed: Some(1) })
    }

    #[test]
    fn test_new_session_has_greeting() {
        let session = session();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::Assistant);
        assert_eq!(session.stage(), ConversationStage::Introduction);
        assert!(session.missing_required_fields().is_empty());
    }

    #[test]
    fn test_select_scenario_emits_event() {
        let mut session = session();
        let mut rx = session.subscribe();
        session.select_scenario("new-paid-trade");

        match rx.try_recv().unwrap() {
            SessionEvent::ScenarioSelected { scenario_id, known } => {
                assert_eq!(scenario_id, "new-paid-trade");
                assert!(known);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(session.required_documents().contains(&"delivery-report".to_string()));
    }

    #[test]
    fn test_manual_stage_forward_only() {
        let mut session = session();
        assert!(session.set_stage(ConversationStage::Closing).is_some());
        assert!(session.set_stage(ConversationStage::Presentation).is_none());
        assert_eq!(session.stage(), ConversationStage::Closing);
    }

    #[test]
    fn test_prompt_context_uses_playbook_ladder_threshold() {
        let mut session = session();
        session.set_stage(ConversationStage::Presentation);
        let context = session.prompt_context();
        assert_eq!(context.yes_ladder_min_agreements, 2);
        assert_eq!(context.technique_hint(), TechniqueKind::General);
    }
}
