//! Supervisor: LLM classifier seam, routing state machine,
//! conversation state.

pub mod agent;
pub mod classifier;
pub mod conversation;
pub mod keywords;
pub mod router;

pub use agent::RoutingAgent;
pub use classifier::{CacheClassification, Classifier, DataType, KeywordOnlyClassifier};
pub use conversation::{ActiveAgent, ConversationState, Message, Session};
pub use router::{SupervisorError, SupervisorRouter, TurnOutcome, TurnRequest};
