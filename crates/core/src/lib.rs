//! Core traits and types for the dealership sales assistant
//!
//! This crate provides foundational types used across all other crates:
//! - Deal records (customer, vehicle, trade-in, lender) and form-data flattening
//! - Scenario feature flags
//! - Conversation stages, chat messages and technique suggestions
//! - Document template metadata
//! - Boundary traits for the chat model and template analysis
//! - Error types

pub mod conversation;
pub mod error;
pub mod record;
pub mod scenario;
pub mod template;
pub mod traits;

pub use conversation::{ChatMessage, ConversationStage, Message, Role, TechniqueKind, TechniqueSuggestion};
pub use error::{Error, Result};
pub use record::{
    CustomerRecord, DealRecord, FieldCategory, LenderRecord, TradeInRecord, VehicleRecord,
};
pub use scenario::{ScenarioFeature, ScenarioFeatures, TradeInStatus};
pub use template::{DiscoveredField, DocumentTemplate, FormFieldSet};
pub use traits::{AnalysisRequest, ChatModel, ChatRequest, TemplateAnalyzer};
