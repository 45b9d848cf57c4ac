//! Supervisor Router: the central per-turn state machine.

use crate::agent::RoutingAgent;
use crate::classifier::Classifier;
use crate::conversation::ConversationState;
use crate::keywords;
use a2a::{A2aClient, A2aClientError, SendParams};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use stream_event::{StepStatus, SupervisorEvent};
use telemetry::{SharedSink, TelemetryEvent};
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use user_cache::UserCache;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("a2a dispatch failed: {0}")]
    A2a(#[from] A2aClientError),
    #[error("failed to send turn events")]
    EventChannelClosed,
}

#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub session_id: Option<String>,
    pub customer_id: String,
    pub user_email: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: String,
    pub response_text: String,
    pub agent_name: Option<String>,
}

const EMAIL_PREFIX_MARKER: &str = "my username is ";

/// Idempotent email-prefix for Payment Agent dispatch:
/// never double-prepends a message that already carries the marker.
fn prefix_with_email(email: &str, content: &str) -> String {
    if content.starts_with(EMAIL_PREFIX_MARKER) {
        content.to_string()
    } else {
        format!("my username is {email}, {content}")
    }
}

pub struct SupervisorRouter {
    conversation: Arc<ConversationState>,
    classifier: Arc<dyn Classifier>,
    cache: Arc<UserCache>,
    a2a: Arc<A2aClient>,
    sink: SharedSink,
}

impl SupervisorRouter {
    pub fn new(
        conversation: Arc<ConversationState>,
        classifier: Arc<dyn Classifier>,
        cache: Arc<UserCache>,
        a2a: Arc<A2aClient>,
        sink: SharedSink,
    ) -> Self {
        Self {
            conversation,
            classifier,
            cache,
            a2a,
            sink,
        }
    }

    async fn emit(&self, events: &Sender<SupervisorEvent>, event: SupervisorEvent) {
        let _ = events.send(event).await;
    }

    async fn emit_step(
        &self,
        events: &Sender<SupervisorEvent>,
        step: &str,
        message: &str,
        agent_name: Option<String>,
    ) {
        self.emit(
            events,
            SupervisorEvent::thinking(
                step,
                StepStatus::Completed,
                message,
                agent_name,
                Utc::now().to_rfc3339(),
                None,
            ),
        )
        .await;
    }

    /// Runs one full turn, emitting progress events in `STEP_ORDER` order
    /// and returning the final response text, emitting progress events in order.
    pub async fn handle_turn(
        &self,
        request: TurnRequest,
        events: Sender<SupervisorEvent>,
    ) -> Result<TurnOutcome, SupervisorError> {
        let started = Instant::now();
        let session_id = match &request.session_id {
            Some(id) => id.clone(),
            None => self.conversation.create_session(&request.customer_id),
        };

        let turn_lock = self.conversation.lock_for_turn(&session_id);
        let _guard = turn_lock.lock().await;

        self.conversation.add_message(&session_id, "user", &request.message);
        self.emit_step(&events, "analyzing", "Analyzing your request", None).await;

        if let Some(outcome) = self.try_continuation(&request, &session_id, &events).await {
            return self.finish(request, session_id, outcome, started).await;
        }

        if keywords::is_escalation_fast_path(&request.message) {
            self.emit_step(&events, "routing", "Routing to a specialist", None).await;
            let outcome = self
                .dispatch(&request, &session_id, RoutingAgent::Escalation, &events)
                .await?;
            return self.finish(request, session_id, outcome, started).await;
        }

        if let Some(outcome) = self
            .try_cache_hit(&request, &session_id, &events)
            .await?
        {
            return self.finish(request, session_id, outcome, started).await;
        }

        let target = self.classify_target(&request).await;
        self.emit_step(
            &events,
            "routing",
            &format!("Routing to {}", target.display_name()),
            None,
        )
        .await;
        let outcome = self.dispatch(&request, &session_id, target, &events).await?;
        self.finish(request, session_id, outcome, started).await
    }

    async fn try_continuation(
        &self,
        request: &TurnRequest,
        session_id: &str,
        events: &Sender<SupervisorEvent>,
    ) -> Option<(String, Option<String>)> {
        if !keywords::is_continuation(&request.message) {
            return None;
        }
        let active = self.conversation.get_active_agent(session_id)?;
        self.emit_step(events, "continuation", "Continuing with the same agent", Some(active.name.clone()))
            .await;
        let response = self.send_to_endpoint(request, session_id, &active.name, &active.endpoint, events).await;
        match response {
            Ok(text) => Some((text, Some(active.name))),
            Err(_) => None,
        }
    }

    /// Step 4: cache probe. Returns `Some` only on a genuine cache hit,
    /// which short-circuits the rest of the turn.
    async fn try_cache_hit(
        &self,
        request: &TurnRequest,
        _session_id: &str,
        events: &Sender<SupervisorEvent>,
    ) -> Result<Option<(String, Option<String>)>, SupervisorError> {
        if keywords::is_write_intent(&request.message)
            || keywords::is_financial_advice(&request.message)
            || keywords::is_product_info(&request.message)
        {
            return Ok(None);
        }

        let classification = self.classifier.classify_for_cache(&request.message).await;
        if !classification.can_use_cache {
            return Ok(None);
        }
        let Some(data_type) = classification.data_type else {
            return Ok(None);
        };
        let key = match data_type {
            crate::classifier::DataType::Balance => "balance",
            crate::classifier::DataType::AccountDetails => "account",
            crate::classifier::DataType::Transactions => "transactions",
            crate::classifier::DataType::Beneficiaries => "beneficiaries",
            crate::classifier::DataType::Limits => "limits",
        };
        let Some(value) = self.cache.get(&request.customer_id, Some(key)).await else {
            return Ok(None);
        };

        self.emit_step(events, "checking_cache", "Serving from cache", None).await;
        self.emit_step(events, "routing", "Routing to cached data", Some("Account Agent".to_string()))
            .await;
        let text = render_cached_value(key, &value);
        self.emit(events, SupervisorEvent::content_delta(text.clone())).await;
        Ok(Some((text, Some("Account Agent".to_string()))))
    }

    async fn classify_target(&self, request: &TurnRequest) -> RoutingAgent {
        if keywords::is_financial_advice(&request.message) {
            return RoutingAgent::AiMoneyCoach;
        }
        if keywords::is_product_info(&request.message) {
            return RoutingAgent::ProductInfo;
        }
        let scores = keywords::score_agents(&request.message);
        if let Some(agent) = keywords::select_high_confidence(&scores) {
            return agent;
        }
        self.classifier.classify_for_routing(&request.message).await
    }

    async fn dispatch(
        &self,
        request: &TurnRequest,
        session_id: &str,
        target: RoutingAgent,
        events: &Sender<SupervisorEvent>,
    ) -> Result<(String, Option<String>), SupervisorError> {
        self.emit_step(
            events,
            "agent_selected",
            &format!("Selected {}", target.display_name()),
            Some(target.display_name().to_string()),
        )
        .await;

        let history = self.conversation.history(session_id);
        let mut payload_history = Vec::new();
        for message in &history {
            let content = if target == RoutingAgent::Payment && message.role == "user" {
                prefix_with_email(&request.user_email, &message.content)
            } else {
                message.content.clone()
            };
            payload_history.push(json!({"role": message.role, "content": content}));
        }
        let current_message = if target == RoutingAgent::Payment {
            prefix_with_email(&request.user_email, &request.message)
        } else {
            request.message.clone()
        };

        self.emit_step(events, "gathering_data", "Gathering data", None).await;
        let response = self
            .a2a
            .send(SendParams {
                target_capability: target.capability(),
                intent: target.capability(),
                payload: json!({"message": current_message, "history": payload_history}),
                target_agent_id: None,
                target_agent_name: None,
                trace_id: None,
                span_id: None,
                timeout_seconds: None,
            })
            .await?;

        self.emit_step(events, "generating", "Generating response", None).await;
        let text = response
            .response
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        for word in text.split_whitespace() {
            self.emit(events, SupervisorEvent::content_delta(format!("{word} "))).await;
        }

        self.conversation.set_active_agent(session_id, target.display_name(), &response.source.agent_id);
        Ok((text, Some(target.display_name().to_string())))
    }

    async fn send_to_endpoint(
        &self,
        request: &TurnRequest,
        _session_id: &str,
        agent_name: &str,
        _endpoint: &str,
        events: &Sender<SupervisorEvent>,
    ) -> Result<String, SupervisorError> {
        let target = RoutingAgent::from_display_name(agent_name).unwrap_or(RoutingAgent::Account);
        let (text, _) = self.dispatch(request, "", target, events).await?;
        Ok(text)
    }

    async fn finish(
        &self,
        request: TurnRequest,
        session_id: String,
        outcome: (String, Option<String>),
        started: Instant,
    ) -> Result<TurnOutcome, SupervisorError> {
        let (text, agent_name) = outcome;
        self.conversation.add_message(&session_id, "assistant", &text);

        let duration_s = started.elapsed().as_secs_f64();
        self.sink
            .record(TelemetryEvent::UserMessage {
                ts: Utc::now(),
                session_id: session_id.clone(),
                customer_id: request.customer_id,
                query: request.message,
                response_preview: text.chars().take(200).collect(),
                duration_s,
            })
            .await;

        Ok(TurnOutcome {
            session_id,
            response_text: text,
            agent_name,
        })
    }
}

fn render_cached_value(key: &str, value: &Value) -> String {
    match key {
        "balance" => format!("Your current balance is {value}."),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::KeywordOnlyClassifier;

    #[test]
    fn email_prefix_is_idempotent() {
        let once = prefix_with_email("a@b.com", "send 10 to bob");
        assert_eq!(once, "my username is a@b.com, send 10 to bob");
        let twice = prefix_with_email("a@b.com", &once);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn classify_target_prefers_financial_advice_over_keyword_scores() {
        let conversation = Arc::new(ConversationState::new());
        let classifier: Arc<dyn Classifier> = Arc::new(KeywordOnlyClassifier);
        let cache = Arc::new(UserCache::new(user_cache::UserCacheConfig::default()));
        let a2a = Arc::new(A2aClient::new(
            a2a::AgentIdentifier {
                agent_id: "supervisor".into(),
                agent_name: "Supervisor".into(),
            },
            Arc::new(EmptyDirectory),
            a2a::A2aClientConfig::default(),
        ));
        let router = SupervisorRouter::new(
            conversation,
            classifier,
            cache,
            a2a,
            Arc::new(telemetry::NullSink),
        );
        let target = router
            .classify_target(&TurnRequest {
                session_id: None,
                customer_id: "cust-1".into(),
                user_email: "a@b.com".into(),
                message: "how should I budget for retirement".into(),
            })
            .await;
        assert_eq!(target, RoutingAgent::AiMoneyCoach);
    }

    struct EmptyDirectory;

    #[async_trait::async_trait]
    impl a2a::AgentDirectory for EmptyDirectory {
        async fn discover_by_capability(&self, _capability: &str) -> Vec<a2a::AgentEndpoint> {
            vec![]
        }
        async fn get_agent(&self, _agent_id: &str) -> Option<a2a::AgentEndpoint> {
            None
        }
    }
}
