//! A2A Client: discovery-driven send with retry, backoff,
//! circuit breaking and tracing.

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::message::{A2aMessage, A2aMetadata, A2aResponse, AgentIdentifier, ResponseStatus};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Minimal view of a discoverable agent the client needs to dispatch a send.
#[derive(Debug, Clone)]
pub struct AgentEndpoint {
    pub agent_id: String,
    pub agent_name: String,
    pub a2a_url: String,
}

/// Seam onto the Registry so `a2a` never depends on `registry` directly,
/// discovery is just "give me agents for this capability".
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn discover_by_capability(&self, capability: &str) -> Vec<AgentEndpoint>;
    async fn get_agent(&self, agent_id: &str) -> Option<AgentEndpoint>;
}

#[derive(Error, Debug)]
pub enum A2aClientError {
    #[error("no agent found for capability {0}")]
    NoAgentForCapability(String),
    #[error("circuit open for target {0}")]
    CircuitOpen(String),
    #[error("request failed after {attempts} attempt(s): {message}")]
    Exhausted { attempts: u32, message: String },
}

#[derive(Debug, Clone)]
pub struct A2aClientConfig {
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub breaker: CircuitBreakerConfig,
}

impl Default for A2aClientConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff: Duration::from_secs(2),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Target selection strategy ("load-balancing policy is a
/// configurable strategy; default: first-available"). Left as a one-variant
/// enum so a deployment can extend it without touching call sites.
#[derive(Debug, Clone, Copy, Default)]
pub enum SelectionStrategy {
    #[default]
    FirstAvailable,
}

pub struct A2aClient {
    source: AgentIdentifier,
    directory: Arc<dyn AgentDirectory>,
    http: reqwest::Client,
    config: A2aClientConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    strategy: SelectionStrategy,
}

pub struct SendParams<'a> {
    pub target_capability: &'a str,
    pub intent: &'a str,
    pub payload: serde_json::Value,
    pub target_agent_id: Option<&'a str>,
    pub target_agent_name: Option<&'a str>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl A2aClient {
    pub fn new(source: AgentIdentifier, directory: Arc<dyn AgentDirectory>, config: A2aClientConfig) -> Self {
        Self {
            source,
            directory,
            http: reqwest::Client::new(),
            config,
            breakers: DashMap::new(),
            strategy: SelectionStrategy::default(),
        }
    }

    fn breaker_for(&self, target_agent_id: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(target_agent_id.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(self.config.breaker)))
            .clone()
    }

    async fn resolve_target(
        &self,
        params: &SendParams<'_>,
    ) -> Result<AgentEndpoint, A2aClientError> {
        if let Some(id) = params.target_agent_id {
            if let Some(agent) = self.directory.get_agent(id).await {
                return Ok(agent);
            }
        }
        let mut candidates = self.directory.discover_by_capability(params.target_capability).await;
        if let Some(name) = params.target_agent_name {
            candidates.retain(|a| a.agent_name == name);
        }
        match self.strategy {
            SelectionStrategy::FirstAvailable => candidates.into_iter().next(),
        }
        .ok_or_else(|| A2aClientError::NoAgentForCapability(params.target_capability.to_string()))
    }

    /// Sends one A2A message, retrying with exponential backoff. The whole
    /// call is conceptually the span `a2a.send.{intent}`;
    /// `tracing::info_span!` on the target capability/intent stands in for
    /// an OpenTelemetry span.
    pub async fn send(&self, params: SendParams<'_>) -> Result<A2aResponse, A2aClientError> {
        let span = tracing::info_span!(
            "a2a.send",
            intent = params.intent,
            capability = params.target_capability
        );
        let _enter = span.enter();

        let target = self.resolve_target(&params).await?;
        let breaker = self.breaker_for(&target.agent_id);

        if !breaker.can_execute() {
            tracing::warn!(target = %target.agent_id, "circuit open, failing fast");
            return Err(A2aClientError::CircuitOpen(target.agent_id.clone()));
        }

        let timeout_seconds = params.timeout_seconds.unwrap_or(30);
        let message = A2aMessage {
            message_id: common::new_message_id(),
            correlation_id: None,
            protocol_version: "1.0".to_string(),
            timestamp: common::now(),
            source: self.source.clone(),
            target: AgentIdentifier {
                agent_id: target.agent_id.clone(),
                agent_name: target.agent_name.clone(),
            },
            intent: params.intent.to_string(),
            payload: params.payload,
            metadata: A2aMetadata {
                timeout_seconds,
                trace_id: params.trace_id,
                span_id: params.span_id,
                ..A2aMetadata::default()
            },
        };

        let mut last_error = String::new();
        let mut attempts = 0u32;
        for attempt in 0..self.config.max_retries.max(1) {
            attempts = attempt + 1;
            let started = Instant::now();
            match self.attempt_once(&target.a2a_url, &message, timeout_seconds).await {
                Ok(mut response) => {
                    breaker.record_success();
                    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                    response = response.with_processing_time_ms(elapsed_ms);
                    return Ok(response);
                }
                Err(err) => {
                    breaker.record_failure();
                    last_error = err;
                    if attempt + 1 < self.config.max_retries.max(1) {
                        let backoff = self.config.retry_backoff * 2u32.pow(attempt);
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }
        Err(A2aClientError::Exhausted {
            attempts,
            message: last_error,
        })
    }

    async fn attempt_once(
        &self,
        url: &str,
        message: &A2aMessage,
        timeout_seconds: u64,
    ) -> Result<A2aResponse, String> {
        let result = self
            .http
            .post(url)
            .json(message)
            .timeout(Duration::from_secs(timeout_seconds))
            .send()
            .await;

        let resp = match result {
            Ok(r) => r,
            Err(e) => return Err(format!("transport error: {e}")),
        };

        if resp.status().is_server_error() {
            return Err(format!("server error: {}", resp.status()));
        }

        let body: A2aResponse = resp
            .json()
            .await
            .map_err(|e| format!("decode failure: {e}"))?;

        if body.status != ResponseStatus::Success {
            return Err(format!("non-success status: {:?}", body.status));
        }

        Ok(body)
    }
}
