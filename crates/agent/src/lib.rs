//! Sales session framework
//!
//! Features:
//! - Stage-based conversation progression that never moves backward
//! - Technique selection (what-if rebuttals, yes-ladder, gift letters)
//! - Scenario resolution to required documents and field requirements
//! - Typed deal record updates from extracted fields
//! - `SalesSession` context object owning all per-conversation state

pub mod record;
pub mod scenario;
pub mod session;
pub mod stage;
pub mod technique;

pub use record::{AppliedFields, DealRecordStore};
pub use scenario::{ActiveScenario, ScenarioResolver};
pub use session::{SalesSession, SessionEvent, SessionOptions, SessionSummary, TurnOutcome};
pub use stage::{StageManager, StageTransition, TransitionReason};
pub use technique::{gift_phrase, AgreementTracker, TechniqueSelector};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Chat model error: {0}")]
    Model(#[from] dealer_assist_core::Error),

    #[error("Message is empty")]
    EmptyMessage,
}
