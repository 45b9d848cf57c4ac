//! Wire shape of a single Supervisor progress event.
//!
//! A turn emits a strict prefix of the step order below, then content chunks,
//! then exactly one terminal event. This type is the HTTP-framework-free
//! payload; `supervisor-server` wraps each one in an SSE `data:` line.

use serde::Serialize;
use serde_json::Value;

/// `status` field of a `thinking` step event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    InProgress,
    Completed,
}

/// Fixed step order a turn's `thinking` events must be a prefix of.
pub const STEP_ORDER: &[&str] = &[
    "analyzing",
    "checking_cache",
    "continuation",
    "routing",
    "agent_selected",
    "mcp_tools_invoked",
    "gathering_data",
    "generating",
];

/// One event in a Supervisor turn's stream.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SupervisorEvent {
    /// A `thinking` progress step.
    Thinking {
        step: String,
        status: StepStatus,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent_name: Option<String>,
        timestamp: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
    },
    /// A content delta chunk. Carries no envelope fields.
    ContentDelta { content: String, role: &'static str },
    /// Custom/forward-compatible payload, for anything not yet modeled.
    Custom { value: Value },
}

impl SupervisorEvent {
    pub fn thinking(
        step: &str,
        status: StepStatus,
        message: impl Into<String>,
        agent_name: Option<String>,
        timestamp: impl Into<String>,
        duration: Option<f64>,
    ) -> Self {
        SupervisorEvent::Thinking {
            step: step.to_string(),
            status,
            message: message.into(),
            agent_name,
            timestamp: timestamp.into(),
            duration,
        }
    }

    pub fn content_delta(content: impl Into<String>) -> Self {
        SupervisorEvent::ContentDelta {
            content: content.into(),
            role: "assistant",
        }
    }

    /// Serializes to a JSON object (no SSE framing).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Returns true if `steps` (in emission order) form a prefix of [`STEP_ORDER`].
pub fn is_valid_step_prefix(steps: &[&str]) -> bool {
    steps
        .iter()
        .zip(STEP_ORDER.iter())
        .all(|(seen, expected)| seen == expected)
        && steps.len() <= STEP_ORDER.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thinking_serializes_with_tag() {
        let ev = SupervisorEvent::thinking(
            "analyzing",
            StepStatus::InProgress,
            "Analyzing your request",
            None,
            "2026-07-31T00:00:00Z",
            None,
        );
        let v = ev.to_value().unwrap();
        assert_eq!(v["type"], "thinking");
        assert_eq!(v["step"], "analyzing");
        assert_eq!(v["status"], "in_progress");
    }

    #[test]
    fn content_delta_round_trips() {
        let ev = SupervisorEvent::content_delta("hello");
        let v = ev.to_value().unwrap();
        assert_eq!(v["type"], "content_delta");
        assert_eq!(v["content"], "hello");
    }

    #[test]
    fn step_prefix_validation() {
        assert!(is_valid_step_prefix(&["analyzing", "routing"]));
        assert!(is_valid_step_prefix(&[]));
        assert!(is_valid_step_prefix(STEP_ORDER));
        assert!(!is_valid_step_prefix(&["routing", "analyzing"]));
        assert!(!is_valid_step_prefix(&["analyzing", "nonsense"]));
    }
}
