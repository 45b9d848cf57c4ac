//! Turns `stream_event::SupervisorEvent` values into the OpenAI-compatible
//! SSE payload shapes, kept free of any axum/HTTP types so it
//! can be unit tested without a running server.

use serde_json::{json, Value};
use stream_event::SupervisorEvent;

/// One `data:` line's JSON body for a `thinking`/`content_delta` event, or
/// `None` for event kinds that don't cross the wire as-is.
pub fn to_wire_value(event: &SupervisorEvent) -> Option<Value> {
    match event {
        SupervisorEvent::Thinking { .. } => event.to_value().ok(),
        SupervisorEvent::ContentDelta { content, role } => Some(json!({
            "choices": [{"delta": {"content": content, "role": role}}]
        })),
        SupervisorEvent::Custom { value } => Some(value.clone()),
    }
}

/// Terminal marker carrying the full response and session id.
pub fn terminal_value(thread_id: &str, full_content: &str) -> Value {
    json!({
        "choices": [{"message": {"content": full_content, "role": "assistant"}}],
        "threadId": thread_id,
    })
}

/// Formats a JSON value as one SSE `data:` line, matching this codebase's
/// existing OpenAI-compatible SSE framing convention.
pub fn write_sse_line(value: &Value) -> String {
    format!("data: {value}\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_event::StepStatus;

    #[test]
    fn thinking_event_round_trips_as_wire_value() {
        let event = SupervisorEvent::thinking(
            "analyzing",
            StepStatus::Completed,
            "done",
            None,
            "2026-07-31T00:00:00Z",
            None,
        );
        let value = to_wire_value(&event).unwrap();
        assert_eq!(value["type"], "thinking");
    }

    #[test]
    fn content_delta_maps_to_openai_choices_shape() {
        let event = SupervisorEvent::content_delta("hi");
        let value = to_wire_value(&event).unwrap();
        assert_eq!(value["choices"][0]["delta"]["content"], "hi");
    }

    #[test]
    fn terminal_value_carries_thread_id_and_full_content() {
        let value = terminal_value("session-1", "hello world");
        assert_eq!(value["threadId"], "session-1");
        assert_eq!(value["choices"][0]["message"]["content"], "hello world");
    }

    #[test]
    fn write_sse_line_frames_as_data_line() {
        let line = write_sse_line(&json!({"a": 1}));
        assert_eq!(line, "data: {\"a\":1}\n\n");
    }
}
