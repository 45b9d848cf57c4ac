//! `POST /chat`: the Supervisor's client-facing chat endpoint.

use crate::sse::{terminal_value, to_wire_value, write_sse_line};
use crate::AppState;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::Router;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use supervisor::TurnRequest;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/chat", post(chat)).with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, rename = "threadId")]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default = "default_customer_id")]
    pub customer_id: String,
    #[serde(default = "default_email")]
    pub user_email: String,
}

fn default_customer_id() -> String {
    "unknown-customer".to_string()
}

fn default_email() -> String {
    "unknown@example.com".to_string()
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    #[serde(rename = "threadId")]
    thread_id: String,
    content: String,
}

async fn chat(State(state): State<Arc<AppState>>, Json(request): Json<ChatRequest>) -> impl IntoResponse {
    let last_message = request
        .messages
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();
    let mut turn_request = TurnRequest {
        session_id: request.thread_id.clone(),
        customer_id: request.customer_id.clone(),
        user_email: request.user_email.clone(),
        message: last_message,
    };

    if !request.stream {
        let (tx, _rx) = tokio::sync::mpsc::channel(32);
        return match state.router.handle_turn(turn_request, tx).await {
            Ok(outcome) => Json(ChatResponse {
                thread_id: outcome.session_id,
                content: outcome.response_text,
            })
            .into_response(),
            Err(err) => {
                tracing::warn!(error = %err, "turn failed");
                Json(ChatResponse {
                    thread_id: String::new(),
                    content: "Sorry, something went wrong. Please try again.".to_string(),
                })
                .into_response()
            }
        };
    }

    let session_id = turn_request
        .session_id
        .clone()
        .unwrap_or_else(common::new_session_id);
    turn_request.session_id = Some(session_id.clone());

    let (tx, rx) = tokio::sync::mpsc::channel(64);
    let router = state.router.clone();
    tokio::spawn(async move {
        let outcome = router.handle_turn(turn_request, tx.clone()).await;
        if let Ok(outcome) = outcome {
            let _ = tx
                .send(stream_event::SupervisorEvent::Custom {
                    value: terminal_value(&outcome.session_id, &outcome.response_text),
                })
                .await;
        }
    });

    Sse::new(sse_stream(rx, session_id))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Converts one event to its wire JSON and stamps `session_id`/a monotonic
/// `event_id` onto it via `EnvelopeState`, or `None` for event kinds that
/// don't cross the wire. Kept free of axum types so it is unit testable
/// without a running server.
fn stamp_wire_value(
    event: &stream_event::SupervisorEvent,
    envelope: &mut stream_event::EnvelopeState,
) -> Option<serde_json::Value> {
    to_wire_value(event).map(|mut value| {
        envelope.inject_into(&mut value);
        value
    })
}

fn sse_stream(
    rx: tokio::sync::mpsc::Receiver<stream_event::SupervisorEvent>,
    session_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let mut envelope = stream_event::EnvelopeState::new(session_id);
    ReceiverStream::new(rx)
        .filter_map(move |event| stamp_wire_value(&event, &mut envelope).map(|value| Ok(Event::default().data(write_sse_line(&value)))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_event::{EnvelopeState, StepStatus, SupervisorEvent};

    #[test]
    fn stamp_wire_value_applies_session_id_and_increasing_event_id() {
        let event = SupervisorEvent::thinking(
            "analyzing",
            StepStatus::InProgress,
            "working",
            None,
            "2026-07-31T00:00:00Z",
            None,
        );
        let mut envelope = EnvelopeState::new("sess-1".to_string());

        let first = stamp_wire_value(&event, &mut envelope).unwrap();
        let second = stamp_wire_value(&event, &mut envelope).unwrap();

        assert_eq!(first["session_id"], "sess-1");
        assert_eq!(first["event_id"], 1);
        assert_eq!(second["event_id"], 2);
    }
}

