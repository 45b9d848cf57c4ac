//! Supervisor progress-event wire shape: type + payload + envelope.
//!
//! This crate defines the event a Supervisor turn emits and the envelope
//! fields (`session_id`, `event_id`) stamped onto it. It has no HTTP
//! dependency; `supervisor-server` turns each value into an SSE `data:` line.

pub mod envelope;
pub mod event;

pub use envelope::{to_json, Envelope, EnvelopeState};
pub use event::{is_valid_step_prefix, StepStatus, SupervisorEvent, STEP_ORDER};
