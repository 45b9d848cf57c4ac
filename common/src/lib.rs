//! Ambient stack shared by every crate in the banking agent fabric:
//! a blanket error type for HTTP edges, a pluggable bearer-token verifier,
//! and small id/time helpers used the same way everywhere.

pub mod auth;
pub mod error;
pub mod ids;

pub use auth::{AuthError, BearerClaims, TokenVerifier};
pub use error::AgentError;
pub use ids::{new_agent_id, new_message_id, new_session_id, now};
