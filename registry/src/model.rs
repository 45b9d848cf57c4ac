//! Registry data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Supervisor,
    Domain,
    Knowledge,
    Utility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Inactive,
    Maintenance,
    Degraded,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::Maintenance => "maintenance",
            AgentStatus::Degraded => "degraded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AgentStatus::Active),
            "inactive" => Some(AgentStatus::Inactive),
            "maintenance" => Some(AgentStatus::Maintenance),
            "degraded" => Some(AgentStatus::Degraded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEndpoints {
    pub http: String,
    pub health: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
    pub a2a: String,
}

/// A registered agent (`status != active` excludes it
/// from default discovery; `last_heartbeat` is monotonic per agent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegistration {
    pub agent_id: String,
    pub agent_name: String,
    pub agent_type: AgentType,
    pub version: String,
    pub capabilities: HashSet<String>,
    #[serde(default)]
    pub capabilities_detailed: BTreeMap<String, serde_json::Value>,
    pub endpoints: AgentEndpoints,
    pub health_check_url: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub tags: HashSet<String>,
    pub status: AgentStatus,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
}

/// Inbound registration request (`POST /register`).
#[derive(Debug, Clone, Deserialize)]
pub struct AgentRegistrationRequest {
    pub agent_name: String,
    pub agent_type: AgentType,
    pub version: String,
    pub capabilities: HashSet<String>,
    #[serde(default)]
    pub capabilities_detailed: BTreeMap<String, serde_json::Value>,
    pub endpoints: AgentEndpoints,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub tags: HashSet<String>,
}

/// Discovery filter (`GET /discover`).
#[derive(Debug, Clone, Default)]
pub struct AgentDiscoveryRequest {
    pub capability: Option<String>,
    pub agent_type: Option<AgentType>,
    pub status: Option<AgentStatus>,
    pub tags: Vec<String>,
}

impl AgentDiscoveryRequest {
    /// Default discovery excludes non-active agents.
    pub fn default_active() -> Self {
        Self {
            status: Some(AgentStatus::Active),
            ..Default::default()
        }
    }
}
