//! Telemetry Sink: structured NDJSON events for user messages, agent
//! decisions, triage rule matches, tool invocations, errors and audit
//! records. Pluggable via explicit constructor injection so tests can pass
//! fakes instead of touching disk.

pub mod event;
pub mod sink;

pub use event::TelemetryEvent;
pub use sink::{NdjsonFileSink, NullSink, SharedSink, TelemetrySink};
