//! LLM Classifier. The LLM backend is out of scope; this
//! module defines the trait contract plus a degrade-safe fallback.

use crate::agent::RoutingAgent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Balance,
    AccountDetails,
    Transactions,
    Beneficiaries,
    Limits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheClassification {
    pub can_use_cache: bool,
    pub data_type: Option<DataType>,
    pub reasoning: String,
}

/// Classify-for-cache and classify-for-routing, both documented
/// as `temperature=0` JSON-mode calls against whatever LLM backend a
/// deployment plugs in here.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify_for_cache(&self, query: &str) -> CacheClassification;
    async fn classify_for_routing(&self, query: &str) -> RoutingAgent;
}

/// Fallback used when no LLM provider is configured or it is saturated
/// Mirrors the documented failure-mode defaults:
/// cache classification failure means `can_use_cache=false`; routing
/// classification failure defaults to the Account Agent.
pub struct KeywordOnlyClassifier;

#[async_trait]
impl Classifier for KeywordOnlyClassifier {
    async fn classify_for_cache(&self, _query: &str) -> CacheClassification {
        CacheClassification {
            can_use_cache: false,
            data_type: None,
            reasoning: "no LLM classifier configured, defaulting to live routing".to_string(),
        }
    }

    async fn classify_for_routing(&self, _query: &str) -> RoutingAgent {
        RoutingAgent::Account
    }
}
