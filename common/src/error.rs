//! Blanket error type for HTTP edges.
//!
//! Library crates define their own narrow `thiserror` enums; the two server
//! binaries (`registry-server`, `supervisor-server`) convert those into
//! `AgentError` to pick an HTTP status and a message that is safe to show a
//! caller. Internal `Display` text of a wrapped error is never forwarded to
//! an end user verbatim outside of `Internal`'s debug logging.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("circuit open for {0}")]
    CircuitOpen(String),
    #[error("internal error")]
    Internal(#[source] anyhow_compat::BoxError),
}

/// A tiny stand-in for `anyhow::Error` so library errors can be boxed without
/// pulling in a new error-handling crate beyond `thiserror`.
pub mod anyhow_compat {
    pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
}

impl AgentError {
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AgentError::Internal(Box::new(err))
    }

    /// Status code a `registry-server`/`supervisor-server` handler should
    /// return for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AgentError::NotFound(_) => 404,
            AgentError::Unauthorized => 401,
            AgentError::BadRequest(_) => 400,
            AgentError::Unavailable(_) => 503,
            AgentError::CircuitOpen(_) => 503,
            AgentError::Internal(_) => 500,
        }
    }

    /// Short, user-safe message ("Supervisor never exposes internal
    /// exceptions; it produces a user-visible natural-language message").
    pub fn user_message(&self) -> String {
        match self {
            AgentError::NotFound(what) => format!("{what} was not found."),
            AgentError::Unauthorized => "You are not authorized to do that.".to_string(),
            AgentError::BadRequest(msg) => msg.clone(),
            AgentError::Unavailable(_) | AgentError::CircuitOpen(_) => {
                "This service is temporarily unavailable. Please try again shortly.".to_string()
            }
            AgentError::Internal(_) => {
                "Something went wrong on our side. Please try again.".to_string()
            }
        }
    }
}
