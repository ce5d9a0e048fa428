//! Sales technique selection
//!
//! Picks one suggestion per user message from the playbook:
//! - Presentation: yes-ladder questions once enough agreements are collected
//! - Handling objections: "what if" rebuttals matched by keyword
//! - Closing: a gift-letter phrase once the customer has agreed often enough
//! - Anything else: the stage's general guidance
//!
//! Selection is deterministic given the agreement count and the random source,
//! so callers that seed the generator get reproducible suggestions.

use dealer_assist_config::domain::contains_any;
use dealer_assist_config::{DealerDomainConfig, SalesPlaybook};
use dealer_assist_core::{ConversationStage, TechniqueKind, TechniqueSuggestion};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

/// Pick a phrase from a list by index, wrapping around
pub fn gift_phrase(choices: &[String], index: usize) -> Option<&str> {
    if choices.is_empty() {
        return None;
    }
    Some(choices[index % choices.len()].as_str())
}

/// Agreements collected so far in a session
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgreementTracker {
    count: usize,
    topics: Vec<String>,
}

impl AgreementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Record an agreement, keeping a short snippet of the message
    pub fn record(&mut self, message: &str, snippet_chars: usize) -> usize {
        let snippet: String = message.chars().take(snippet_chars).collect();
        self.topics.push(format!("{snippet}..."));
        self.count += 1;
        self.count
    }
}

pub struct TechniqueSelector {
    domain: Arc<DealerDomainConfig>,
}

impl TechniqueSelector {
    pub fn from_domain(domain: &Arc<DealerDomainConfig>) -> Self {
        Self {
            domain: Arc::clone(domain),
        }
    }

    fn playbook(&self) -> &SalesPlaybook {
        &self.domain.playbook
    }

    pub fn is_objection(&self, message: &str) -> bool {
        contains_any(message, &self.playbook().objection_keywords)
    }

    pub fn is_agreement(&self, message: &str) -> bool {
        contains_any(message, &self.playbook().agreement_keywords)
    }

    /// Characters of an agreeing message kept as its topic
    pub fn snippet_chars(&self) -> usize {
        self.playbook().agreement_snippet_chars
    }

    /// Ladder question for the given agreement count.
    ///
    /// Base questions are asked in order; past the end the advanced list cycles.
    pub fn yes_ladder_question(&self, agreements: usize) -> &str {
        let ladder = &self.playbook().yes_ladder;
        if agreements < ladder.base.len() {
            return &ladder.base[agreements];
        }
        if ladder.advanced.is_empty() {
            return gift_phrase(&ladder.base, agreements).unwrap_or_default();
        }
        let index = (agreements - ladder.base.len()) % ladder.advanced.len();
        &ladder.advanced[index]
    }

    /// First rebuttal whose keyword appears in the message, else the fallback
    pub fn rebuttal_for(&self, message: &str) -> &str {
        let what_if = &self.playbook().what_if;
        let lower = message.to_lowercase();
        what_if
            .rebuttals
            .iter()
            .find(|r| lower.contains(&r.keyword.to_lowercase()))
            .map(|r| r.response.as_str())
            .unwrap_or(&what_if.fallback)
    }

    fn wants_gift(&self, stage: ConversationStage, agreements: usize) -> bool {
        stage == ConversationStage::Closing && agreements >= self.playbook().gift_letter.min_agreements
    }

    /// Select a suggestion, drawing the gift-letter phrase from `rng` when one is needed
    pub fn select<R: Rng + ?Sized>(
        &self,
        message: &str,
        stage: ConversationStage,
        agreements: usize,
        rng: &mut R,
    ) -> TechniqueSuggestion {
        let gifts = &self.playbook().gift_letter.phrases;
        let gift_index = if self.wants_gift(stage, agreements) && !gifts.is_empty() {
            rng.gen_range(0..gifts.len())
        } else {
            0
        };
        self.select_with_index(message, stage, agreements, gift_index)
    }

    /// Select a suggestion with an explicit gift-letter index
    pub fn select_with_index(
        &self,
        message: &str,
        stage: ConversationStage,
        agreements: usize,
        gift_index: usize,
    ) -> TechniqueSuggestion {
        let playbook = self.playbook();

        match stage {
            ConversationStage::Presentation
                if agreements >= playbook.yes_ladder.min_agreements =>
            {
                return TechniqueSuggestion {
                    kind: TechniqueKind::YesLadder,
                    technique: playbook.yes_ladder.technique.clone(),
                    suggestion: self.yes_ladder_question(agreements).to_string(),
                };
            }
            ConversationStage::HandlingObjections if self.is_objection(message) => {
                return TechniqueSuggestion {
                    kind: TechniqueKind::WhatIf,
                    technique: playbook.what_if.technique.clone(),
                    suggestion: self.rebuttal_for(message).to_string(),
                };
            }
            ConversationStage::Closing if self.wants_gift(stage, agreements) => {
                if let Some(phrase) = gift_phrase(&playbook.gift_letter.phrases, gift_index) {
                    return TechniqueSuggestion {
                        kind: TechniqueKind::GiftLetter,
                        technique: playbook.gift_letter.technique.clone(),
                        suggestion: phrase.to_string(),
                    };
                }
            }
            _ => {}
        }

        self.guidance(stage)
    }

    fn guidance(&self, stage: ConversationStage) -> TechniqueSuggestion {
        match self.playbook().guidance_for(stage) {
            Some(guidance) => TechniqueSuggestion {
                kind: TechniqueKind::General,
                technique: guidance.technique.clone(),
                suggestion: guidance.suggestion.clone(),
            },
            None => TechniqueSuggestion {
                kind: TechniqueKind::General,
                technique: stage.display_name().to_string(),
                suggestion: String::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn selector() -> TechniqueSelector {
        let domain = Arc::new(DealerDomainConfig::builtin().unwrap());
        TechniqueSelector::from_domain(&domain)
    }

    #[test]
    fn test_yes_ladder_order() {
        let selector = selector();
        let ladder = &selector.playbook().yes_ladder;

        assert_eq!(selector.yes_ladder_question(0), ladder.base[0]);
        assert_eq!(selector.yes_ladder_question(ladder.base.len()), ladder.advanced[0]);
        let wrapped = ladder.base.len() + ladder.advanced.len();
        assert_eq!(selector.yes_ladder_question(wrapped), ladder.advanced[0]);
    }

    #[test]
    fn test_presentation_ladder_threshold() {
        let selector = selector();
        let playbook = selector.playbook();
        let threshold = playbook.yes_ladder.min_agreements;
        assert_eq!(threshold, 2);

        for count in 0..threshold {
            let suggestion =
                selector.select_with_index("tell me more", ConversationStage::Presentation, count, 0);
            assert_eq!(suggestion.kind, TechniqueKind::General);
            assert_eq!(suggestion.technique, "Feature-benefit connection");
        }

        let suggestion =
            selector.select_with_index("tell me more", ConversationStage::Presentation, threshold, 0);
        assert_eq!(suggestion.kind, TechniqueKind::YesLadder);
        assert_eq!(suggestion.suggestion, playbook.yes_ladder.base[threshold]);
    }

    #[test]
    fn test_objection_rebuttal_table_order() {
        let selector = selector();
        let rebuttals = &selector.playbook().what_if.rebuttals;

        let suggestion = selector.select_with_index(
            "The price is too expensive",
            ConversationStage::HandlingObjections,
            0,
            0,
        );
        assert_eq!(suggestion.kind, TechniqueKind::WhatIf);
        assert_eq!(suggestion.suggestion, rebuttals[0].response);
    }

    #[test]
    fn test_objection_fallback_and_guidance() {
        let selector = selector();
        assert_eq!(
            selector.rebuttal_for("I'm not sure about this"),
            selector.playbook().what_if.fallback
        );

        let no_objection = selector.select_with_index(
            "Sounds reasonable",
            ConversationStage::HandlingObjections,
            0,
            0,
        );
        assert_eq!(no_objection.kind, TechniqueKind::General);
    }

    #[test]
    fn test_gift_letter_needs_agreements() {
        let selector = selector();
        let before = selector.select_with_index("ok", ConversationStage::Closing, 3, 0);
        assert_eq!(before.kind, TechniqueKind::General);

        let after = selector.select_with_index("ok", ConversationStage::Closing, 4, 1);
        assert_eq!(after.kind, TechniqueKind::GiftLetter);
        assert_eq!(after.suggestion, selector.playbook().gift_letter.phrases[1]);
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let selector = selector();
        let mut first = StdRng::seed_from_u64(7);
        let mut second = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            assert_eq!(
                selector.select("yes", ConversationStage::Closing, 6, &mut first),
                selector.select("yes", ConversationStage::Closing, 6, &mut second)
            );
        }
    }

    #[test]
    fn test_gift_phrase_wraps() {
        let choices = vec!["a".to_string(), "b".to_string()];
        assert_eq!(gift_phrase(&choices, 3), Some("b"));
        assert_eq!(gift_phrase(&[], 0), None);
    }

    #[test]
    fn test_agreement_tracker_snippet() {
        let mut tracker = AgreementTracker::new();
        assert_eq!(tracker.record("Yes, that sounds perfect for our family", 20), 1);
        assert_eq!(tracker.topics()[0], "Yes, that sounds per...");
    }
}
