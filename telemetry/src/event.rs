//! Telemetry event shapes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum TelemetryEvent {
    UserMessage {
        ts: DateTime<Utc>,
        session_id: String,
        customer_id: String,
        query: String,
        response_preview: String,
        duration_s: f64,
    },
    AgentDecision {
        ts: DateTime<Utc>,
        agent: String,
        session_id: String,
        user_query: String,
        triage_rule: String,
        reasoning: String,
        tools_considered: Vec<String>,
        tools_invoked: Vec<String>,
        result_status: String,
        duration_s: f64,
        context: Value,
    },
    TriageRuleMatch {
        ts: DateTime<Utc>,
        rule_name: String,
        target_agent: String,
        confidence: f64,
        query: String,
    },
    ToolInvocation {
        ts: DateTime<Utc>,
        tool: String,
        agent: String,
        params: BTreeMap<String, Value>,
        result_summary: String,
    },
    Error {
        ts: DateTime<Utc>,
        r#type: String,
        message: String,
        details: Option<Value>,
    },
    Audit {
        ts: DateTime<Utc>,
        operation_type: String,
        mcp_server: String,
        tool_name: String,
        user_id: String,
        thread_id: Option<String>,
        sanitized_parameters: BTreeMap<String, Value>,
        data_accessed: Vec<String>,
        data_scope: String,
        result_status: String,
        duration_ms: f64,
        compliance_flags: Vec<String>,
    },
}

impl TelemetryEvent {
    /// File-name category token: per-day NDJSON per category.
    pub fn category(&self) -> &'static str {
        match self {
            TelemetryEvent::UserMessage { .. } => "user_message",
            TelemetryEvent::AgentDecision { .. } => "agent_decision",
            TelemetryEvent::TriageRuleMatch { .. } => "triage_rule_match",
            TelemetryEvent::ToolInvocation { .. } => "tool_invocation",
            TelemetryEvent::Error { .. } => "error",
            TelemetryEvent::Audit { .. } => "audit",
        }
    }

    pub fn ts(&self) -> DateTime<Utc> {
        match self {
            TelemetryEvent::UserMessage { ts, .. }
            | TelemetryEvent::AgentDecision { ts, .. }
            | TelemetryEvent::TriageRuleMatch { ts, .. }
            | TelemetryEvent::ToolInvocation { ts, .. }
            | TelemetryEvent::Error { ts, .. }
            | TelemetryEvent::Audit { ts, .. } => *ts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_matches_variant() {
        let ev = TelemetryEvent::Error {
            ts: Utc::now(),
            r#type: "boom".into(),
            message: "x".into(),
            details: None,
        };
        assert_eq!(ev.category(), "error");
    }
}
