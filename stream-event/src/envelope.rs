//! Envelope (`session_id`, `event_id`) merged onto each emitted event's JSON.
//!
//! The terminal event of a turn must carry `session_id` ; every
//! event in between gets a monotonically increasing `event_id` so a client
//! can detect drops or reordering on a lossy transport.

use crate::event::SupervisorEvent;
use serde_json::Value;

/// Envelope fields merged into one event's JSON object.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    pub session_id: Option<String>,
    pub event_id: Option<u64>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn with_event_id(mut self, id: u64) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Merges envelope fields into the given JSON object (top-level only).
    /// Does not overwrite keys the event already set.
    pub fn inject_into(&self, obj: &mut Value) {
        let Some(obj) = obj.as_object_mut() else {
            return;
        };
        if let Some(ref id) = self.session_id {
            obj.entry("session_id")
                .or_insert_with(|| Value::String(id.clone()));
        }
        if let Some(id) = self.event_id {
            obj.entry("event_id")
                .or_insert_with(|| Value::Number(serde_json::Number::from(id)));
        }
    }
}

/// Per-turn envelope state: one session id, a monotonic event counter.
pub struct EnvelopeState {
    pub session_id: String,
    pub next_event_id: u64,
}

impl EnvelopeState {
    pub fn new(session_id: String) -> Self {
        Self {
            session_id,
            next_event_id: 1,
        }
    }

    pub fn inject_into(&mut self, value: &mut Value) {
        let env = Envelope::new()
            .with_session_id(&self.session_id)
            .with_event_id(self.next_event_id);
        self.next_event_id += 1;
        env.inject_into(value);
    }
}

/// Converts a [`SupervisorEvent`] to JSON and stamps envelope fields.
pub fn to_json(
    event: &SupervisorEvent,
    state: &mut EnvelopeState,
) -> Result<Value, serde_json::Error> {
    let mut value = event.to_value()?;
    state.inject_into(&mut value);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::StepStatus;

    #[test]
    fn envelope_inject_does_not_overwrite() {
        let mut obj = serde_json::json!({"type":"content_delta","session_id":"explicit"});
        let env = Envelope::new().with_session_id("sess-1").with_event_id(1);
        env.inject_into(&mut obj);
        assert_eq!(obj["session_id"], "explicit");
        assert_eq!(obj["event_id"], 1);
    }

    #[test]
    fn to_json_stamps_session_and_event_id() {
        let ev = SupervisorEvent::thinking(
            "analyzing",
            StepStatus::InProgress,
            "working",
            None,
            "2026-07-31T00:00:00Z",
            None,
        );
        let mut state = EnvelopeState::new("sess-abc".to_string());
        let v1 = to_json(&ev, &mut state).unwrap();
        let v2 = to_json(&ev, &mut state).unwrap();
        assert_eq!(v1["session_id"], "sess-abc");
        assert_eq!(v1["event_id"], 1);
        assert_eq!(v2["event_id"], 2);
    }
}
