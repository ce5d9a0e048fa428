//! Conversation stage management
//!
//! Stages only ever move forward. Each user message is checked once against the
//! playbook triggers, in stage order, and at most one step is taken per message.

use dealer_assist_config::domain::contains_any;
use dealer_assist_config::StageTriggers;
use dealer_assist_core::ConversationStage;
use serde::Serialize;

/// Stage transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTransition {
    pub from: ConversationStage,
    pub to: ConversationStage,
    pub reason: TransitionReason,
}

/// Reason for a stage transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    /// Message count crossed the stage threshold
    MessageCount,
    /// Customer raised a concern during presentation
    ObjectionRaised,
    /// Customer signalled their concerns are settled
    ConcernsResolved,
    /// Customer committed to the deal
    Commitment,
    /// Set by the salesperson
    Manual,
}

/// Tracks the current stage and its history
#[derive(Debug, Clone)]
pub struct StageManager {
    current: ConversationStage,
    history: Vec<StageTransition>,
    triggers: StageTriggers,
}

impl StageManager {
    pub fn new(triggers: StageTriggers) -> Self {
        Self {
            current: ConversationStage::default(),
            history: Vec::new(),
            triggers,
        }
    }

    pub fn current(&self) -> ConversationStage {
        self.current
    }

    pub fn history(&self) -> &[StageTransition] {
        &self.history
    }

    /// Next stage for a user message, without applying it.
    ///
    /// `message_count` is the number of messages in the conversation before this one.
    pub fn evaluate(
        &self,
        message_count: usize,
        message: &str,
    ) -> Option<(ConversationStage, TransitionReason)> {
        use ConversationStage::*;
        let t = &self.triggers;
        let stage = self.current;

        if stage == Introduction && message_count > t.needs_assessment_after {
            return Some((NeedsAssessment, TransitionReason::MessageCount));
        }
        if stage == NeedsAssessment && message_count > t.presentation_after {
            return Some((Presentation, TransitionReason::MessageCount));
        }
        if stage == Presentation && message_count > t.objections_after {
            // Past this point presentation only moves on an objection
            if contains_any(message, &t.objection_words) {
                return Some((HandlingObjections, TransitionReason::ObjectionRaised));
            }
            return None;
        }
        if stage == HandlingObjections {
            if contains_any(message, &t.resolution_words) {
                return Some((Closing, TransitionReason::ConcernsResolved));
            }
            if message_count > t.closing_after {
                return Some((Closing, TransitionReason::MessageCount));
            }
        }
        if stage == Closing {
            if contains_any(message, &t.commitment_words) {
                return Some((FollowUp, TransitionReason::Commitment));
            }
            if message_count > t.follow_up_after {
                return Some((FollowUp, TransitionReason::MessageCount));
            }
        }
        None
    }

    /// Evaluate and apply the transition for a user message
    pub fn advance(&mut self, message_count: usize, message: &str) -> Option<StageTransition> {
        let (to, reason) = self.evaluate(message_count, message)?;
        self.transition(to, reason)
    }

    /// Move to `to` if it is ahead of the current stage
    pub fn transition(
        &mut self,
        to: ConversationStage,
        reason: TransitionReason,
    ) -> Option<StageTransition> {
        if to <= self.current {
            return None;
        }
        let transition = StageTransition {
            from: self.current,
            to,
            reason,
        };
        tracing::debug!(from = ?transition.from, to = ?to, ?reason, "Stage transition");
        self.current = to;
        self.history.push(transition.clone());
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConversationStage::*;

    fn triggers() -> StageTriggers {
        StageTriggers {
            objection_words: vec!["concern".into(), "worry".into(), "price".into(), "expensive".into()],
            resolution_words: vec!["fine".into(), "good".into(), "great".into(), "agree".into()],
            commitment_words: vec!["signed".into(), "sold".into(), "take it".into(), "thank you".into()],
            ..StageTriggers::default()
        }
    }

    #[test]
    fn test_introduction_threshold() {
        let mut manager = StageManager::new(triggers());
        assert!(manager.advance(4, "hello").is_none());
        let t = manager.advance(5, "hello").unwrap();
        assert_eq!((t.from, t.to), (Introduction, NeedsAssessment));
        assert_eq!(t.reason, TransitionReason::MessageCount);
    }

    #[test]
    fn test_objection_needs_keyword() {
        let mut manager = StageManager::new(triggers());
        manager.transition(Presentation, TransitionReason::Manual);

        assert!(manager.advance(13, "tell me about the trim levels").is_none());
        let t = manager.advance(13, "I worry about the PRICE").unwrap();
        assert_eq!(t.to, HandlingObjections);
        assert_eq!(t.reason, TransitionReason::ObjectionRaised);
    }

    #[test]
    fn test_resolution_moves_to_closing() {
        let mut manager = StageManager::new(triggers());
        manager.transition(HandlingObjections, TransitionReason::Manual);
        let t = manager.advance(14, "ok that sounds fine").unwrap();
        assert_eq!(t.to, Closing);
        assert_eq!(t.reason, TransitionReason::ConcernsResolved);
    }

    #[test]
    fn test_presentation_waits_for_objection() {
        let mut manager = StageManager::new(triggers());
        manager.transition(Presentation, TransitionReason::Manual);
        assert!(manager.advance(17, "what colors are there").is_none());
        assert!(manager.advance(30, "what colors are there").is_none());
        assert_eq!(manager.current(), Presentation);

        let t = manager.advance(31, "that is too expensive").unwrap();
        assert_eq!(t.to, HandlingObjections);
    }

    #[test]
    fn test_handling_objections_closes_on_count() {
        let mut manager = StageManager::new(triggers());
        manager.transition(HandlingObjections, TransitionReason::Manual);
        assert!(manager.advance(16, "still thinking").is_none());
        let t = manager.advance(17, "still thinking").unwrap();
        assert_eq!(t.to, Closing);
        assert_eq!(t.reason, TransitionReason::MessageCount);
    }

    #[test]
    fn test_follow_up_is_terminal() {
        let mut manager = StageManager::new(triggers());
        manager.transition(Closing, TransitionReason::Manual);
        assert_eq!(manager.advance(18, "I'll take it").unwrap().to, FollowUp);
        assert!(manager.advance(40, "this is great, I agree").is_none());
        assert_eq!(manager.current(), FollowUp);
    }

    #[test]
    fn test_no_backward_transition() {
        let mut manager = StageManager::new(triggers());
        manager.transition(Closing, TransitionReason::Manual);
        assert!(manager.transition(Presentation, TransitionReason::Manual).is_none());
        assert_eq!(manager.current(), Closing);
        assert_eq!(manager.history().len(), 1);
    }

    #[test]
    fn test_twenty_message_exchange_is_monotonic() {
        let script = [
            "hi there",
            "just looking",
            "yes, an SUV",
            "something reliable",
            "sure, that matters",
            "what about the features",
            "ok",
            "I have a concern about the price",
            "sounds good",
            "yes I agree",
        ];
        let mut manager = StageManager::new(triggers());
        let mut seen = vec![manager.current()];
        let mut count = 1;

        for message in script.iter().cycle().take(20) {
            manager.advance(count, message);
            seen.push(manager.current());
            count += 2;
        }

        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(manager.current() >= Closing);
    }
}
