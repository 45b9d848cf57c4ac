//! A2A wire types and codec rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// `(agent_id, agent_name)` pair identifying an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentIdentifier {
    pub agent_id: String,
    pub agent_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_protocol_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2aMetadata {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub additional_context: HashMap<String, Value>,
}

impl Default for A2aMetadata {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            retry_count: 0,
            trace_id: None,
            span_id: None,
            priority: Priority::default(),
            additional_context: HashMap::new(),
        }
    }
}

/// Request envelope sent over `{agent.endpoints.a2a}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2aMessage {
    #[serde(default = "common::new_message_id")]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default = "common::now")]
    pub timestamp: DateTime<Utc>,
    pub source: AgentIdentifier,
    pub target: AgentIdentifier,
    pub intent: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub metadata: A2aMetadata,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2aError {
    pub error_code: String,
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

/// Response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2aResponse {
    #[serde(default = "common::new_message_id")]
    pub message_id: String,
    pub correlation_id: String,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default = "common::now")]
    pub timestamp: DateTime<Utc>,
    pub source: AgentIdentifier,
    pub target: AgentIdentifier,
    pub status: ResponseStatus,
    #[serde(default)]
    pub response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<A2aError>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl A2aResponse {
    /// Builds a success response correlated to `request`, stamping
    /// `processing_time_ms` into metadata.
    pub fn success(request: &A2aMessage, source: AgentIdentifier, response: Value) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(
            "processing_time_ms".to_string(),
            Value::from(0),
        );
        Self {
            message_id: common::new_message_id(),
            correlation_id: request.message_id.clone(),
            protocol_version: default_protocol_version(),
            timestamp: common::now(),
            source,
            target: request.source.clone(),
            status: ResponseStatus::Success,
            response,
            error: None,
            metadata,
        }
    }

    pub fn error(
        request: &A2aMessage,
        source: AgentIdentifier,
        error_code: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            message_id: common::new_message_id(),
            correlation_id: request.message_id.clone(),
            protocol_version: default_protocol_version(),
            timestamp: common::now(),
            source,
            target: request.source.clone(),
            status: ResponseStatus::Error,
            response: Value::Null,
            error: Some(A2aError {
                error_code: error_code.into(),
                error_message: error_message.into(),
                error_details: None,
                retry_after_seconds: None,
            }),
            metadata: HashMap::new(),
        }
    }

    pub fn with_processing_time_ms(mut self, ms: f64) -> Self {
        self.metadata
            .insert("processing_time_ms".to_string(), Value::from(ms));
        self
    }
}
