//! End-to-end session flows against a scripted chat model

use async_trait::async_trait;
use dealer_assist_agent::{SalesSession, SessionEvent, SessionOptions};
use dealer_assist_config::DealerDomainConfig;
use dealer_assist_core::{ChatModel, ChatRequest, ConversationStage, Error, Result, TechniqueKind};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn repeating(reply: &str, times: usize) -> Self {
        Self::new((0..times).map(|_| Ok(reply.to_string())).collect())
    }

    fn last_request(&self) -> ChatRequest {
        self.requests.lock().last().cloned().unwrap()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().push(request.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok("Noted.".to_string()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn session() -> SalesSession {
    let domain = Arc::new(DealerDomainConfig::builtin().unwrap());
    SalesSession::new("test-session", domain, SessionOptions { rng_seed: Some(42) })
}

#[tokio::test]
async fn test_new_no_trade_missing_fields() {
    let mut session = session();
    session.select_scenario("new-no-trade");
    let model = ScriptedModel::new(vec![Ok(
        r#"Nice to meet you, Jane! <field name="firstName">Jane</field><field name="lastName">Doe</field>"#
            .to_string(),
    )]);

    let outcome = session
        .handle_user_message("Hi, I'm Jane Doe", &model)
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Nice to meet you, Jane!");
    assert_eq!(outcome.applied.count(), 2);

    let missing = session.missing_required_fields();
    for expected in [
        "Street Address",
        "City",
        "State",
        "ZIP Code",
        "Email Address",
        "Cell Phone",
        "VIN",
        "Stock Number",
        "Year",
        "Make",
        "Model",
        "Miles",
    ] {
        assert!(missing.iter().any(|m| m == expected), "missing {expected}");
    }
    for excluded in ["First Name", "Last Name", "Trade-in VIN", "Bank/Lender Name", "Payoff Amount"] {
        assert!(!missing.iter().any(|m| m == excluded), "unexpected {excluded}");
    }
    assert_eq!(outcome.missing_fields, missing);
}

#[tokio::test]
async fn test_trade_scenarios_differ() {
    let mut unpaid = session();
    unpaid.select_scenario("used-unpaid-trade");
    let mut no_trade = session();
    no_trade.select_scenario("used-no-trade");

    let unpaid_missing = unpaid.missing_required_fields();
    let no_trade_missing = no_trade.missing_required_fields();

    assert!(unpaid_missing.iter().any(|m| m == "Trade-in VIN"));
    assert!(unpaid_missing.iter().any(|m| m == "Per Diem Amount"));
    assert!(!no_trade_missing.iter().any(|m| m.starts_with("Trade-in")));
}

#[tokio::test]
async fn test_unknown_tag_leaves_record_unchanged() {
    let mut session = session();
    let mut events = session.subscribe();
    let model = ScriptedModel::new(vec![Ok(r#"Sure. <field name="randomKey">x</field>"#.to_string())]);

    let outcome = session.handle_user_message("hello", &model).await.unwrap();

    assert_eq!(outcome.applied.count(), 0);
    assert_eq!(outcome.applied.dropped, vec!["randomKey".to_string()]);
    assert!(session.record().is_empty());
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, SessionEvent::FieldsUpdated { .. }));
    }
}

#[tokio::test]
async fn test_prompt_carries_context() {
    let mut session = session();
    session.select_scenario("used-paid-trade");
    let model = ScriptedModel::repeating("Great.", 1);

    session.handle_user_message("I want a truck", &model).await.unwrap();

    let request = model.last_request();
    assert!(request.system.contains("Current sales scenario: used-paid-trade"));
    assert!(request.system.contains("Current conversation stage: INTRODUCTION"));
    assert!(request.system.contains("Trade-in VIN"));
    // greeting + user message
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[1].content, "I want a truck");
}

#[tokio::test]
async fn test_model_failure_keeps_user_message() {
    let mut session = session();
    let mut events = session.subscribe();
    let model = ScriptedModel::new(vec![Err(Error::Llm("upstream timeout".to_string()))]);

    let result = session.handle_user_message("Hello there", &model).await;

    assert!(result.is_err());
    assert_eq!(session.messages().len(), 2);
    assert_eq!(session.messages()[1].content, "Hello there");
    assert_eq!(session.stage(), ConversationStage::Introduction);

    let mut saw_error = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Error { message } = event {
            assert!(message.contains("upstream timeout"));
            saw_error = true;
        }
    }
    assert!(saw_error);
}

#[tokio::test]
async fn test_stage_never_moves_backward() {
    let mut session = session();
    session.select_scenario("new-no-trade");
    let model = ScriptedModel::repeating("Understood.", 20);
    let script = [
        "Hi, just browsing",
        "We need a family car",
        "Something with room for kids",
        "Safety is important",
        "Yes, that matters",
        "What about the price",
        "I'm worried it's expensive",
        "That sounds fine",
        "Ok, let's talk paperwork",
        "Thank you, I'll take it",
    ];

    let mut stages = vec![session.stage()];
    for message in script.iter().cycle().take(20) {
        let outcome = session.handle_user_message(message, &model).await.unwrap();
        stages.push(outcome.stage);
    }

    assert!(stages.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(session.stage(), ConversationStage::FollowUp);
    assert!(session
        .stage_history()
        .windows(2)
        .all(|w| w[0].to < w[1].to));
}

#[tokio::test]
async fn test_yes_ladder_in_presentation() {
    let domain = Arc::new(DealerDomainConfig::builtin().unwrap());
    let ladder = domain.playbook.yes_ladder.clone();
    let mut session = SalesSession::new("ladder", domain, SessionOptions { rng_seed: Some(3) });
    session.set_stage(ConversationStage::Presentation);
    let model = ScriptedModel::repeating("Right.", 16);

    // Feature-benefit guidance until two agreements are counted
    let first = session.handle_user_message("yes", &model).await.unwrap();
    assert_eq!(first.technique.kind, TechniqueKind::General);
    let second = session.handle_user_message("sure", &model).await.unwrap();
    assert_eq!(second.technique.kind, TechniqueKind::General);

    let third = session.handle_user_message("okay then", &model).await.unwrap();
    assert_eq!(third.technique.kind, TechniqueKind::YesLadder);
    assert_eq!(third.technique.suggestion, ladder.base[2]);

    for _ in 3..ladder.base.len() {
        session.handle_user_message("sure", &model).await.unwrap();
    }
    assert_eq!(session.agreement_count(), ladder.base.len());

    // Stays in presentation: no objection words in the messages
    let next = session.handle_user_message("absolutely", &model).await.unwrap();
    assert_eq!(next.technique.kind, TechniqueKind::YesLadder);
    assert_eq!(next.technique.suggestion, ladder.advanced[0]);
}

#[tokio::test]
async fn test_summary_reports_warnings() {
    let mut session = session();
    session.select_scenario("new-no-trade");
    let model = ScriptedModel::new(vec![Ok(
        r#"Got it. <field name="zipCode">432</field><field name="vehicle_make">Honda</field>"#
            .to_string(),
    )]);

    session.handle_user_message("Zip is 432, want a Honda", &model).await.unwrap();
    let summary = session.summary();

    assert_eq!(summary.form_data.get("vehicle_make").map(String::as_str), Some("Honda"));
    assert_eq!(summary.form_data.get("zipCode").map(String::as_str), Some("432"));
    assert_eq!(summary.validation_warnings, vec!["ZIP Code".to_string()]);
    assert_eq!(summary.required_documents.len(), 4);
    assert_eq!(summary.message_count, 3);
}
