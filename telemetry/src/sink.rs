//! [`TelemetrySink`] trait plus the default NDJSON-per-day-per-category file sink.

use crate::event::TelemetryEvent;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Records one event. Must not block the caller on slow I/O; a
    /// production sink hands the event to a background writer.
    async fn record(&self, event: TelemetryEvent);
}

/// Sink that drops everything. Used in tests and wherever telemetry is
/// explicitly disabled.
pub struct NullSink;

#[async_trait]
impl TelemetrySink for NullSink {
    async fn record(&self, _event: TelemetryEvent) {}
}

/// Default sink: one NDJSON file per category per day under `dir`, e.g.
/// `{dir}/audit_2026-07-31.ndjson`. Writes are serialized through a bounded
/// channel drained by a background task so `record` never blocks on disk.
pub struct NdjsonFileSink {
    tx: mpsc::Sender<TelemetryEvent>,
}

impl NdjsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let (tx, mut rx) = mpsc::channel::<TelemetryEvent>(1024);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(err) = write_event(&dir, &event).await {
                    tracing::warn!(error = %err, "failed to write telemetry event");
                }
            }
        });
        Self { tx }
    }
}

async fn write_event(dir: &Path, event: &TelemetryEvent) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let date = event.ts().format("%Y-%m-%d");
    let path = dir.join(format!("{}_{date}.ndjson", event.category()));
    let mut line = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    line.push('\n');
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;
    file.write_all(line.as_bytes()).await
}

#[async_trait]
impl TelemetrySink for NdjsonFileSink {
    async fn record(&self, event: TelemetryEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::warn!("telemetry writer task is gone; dropping event");
        }
    }
}

/// Convenience: an `Arc<dyn TelemetrySink>` suitable for sharing across
/// `registry-server`, `supervisor-server` and the `a2a`/`mcp-audit` crates.
pub type SharedSink = Arc<dyn TelemetrySink>;
