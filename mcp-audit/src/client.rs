//! Audited MCP tool wrapper.

use crate::derive::{compliance_flags, data_accessed, data_scope, operation_type, sanitize};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;
use telemetry::{SharedSink, TelemetryEvent};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum McpToolError {
    #[error("tool call failed: {0}")]
    CallFailed(String),
}

/// The inner tool-server client an `AuditedMcpTool` wraps. Kept generic so
/// this crate never depends on a specific MCP transport.
#[async_trait]
pub trait McpToolClient: Send + Sync {
    fn server_name(&self) -> &str;
    /// Current connect URL the client would use, prior to any external-URL
    /// override.
    fn resolved_url(&self) -> String;
    /// Invokes the tool against `url` (the effective URL after any
    /// external-URL override has been applied).
    async fn call_tool(&self, url: &str, tool_name: &str, args: Value) -> Result<Value, McpToolError>;
}

#[derive(Debug, Clone, Default)]
pub struct AuditedMcpConfig {
    /// If set and `resolved_url` contains `internal_hostname_marker`, calls
    /// are logged as targeting this URL instead.
    pub prefer_external_url: Option<String>,
    pub internal_hostname_marker: String,
}

pub struct AuditedMcpTool<C: McpToolClient> {
    inner: C,
    config: AuditedMcpConfig,
    sink: SharedSink,
}

impl<C: McpToolClient> AuditedMcpTool<C> {
    pub fn new(inner: C, config: AuditedMcpConfig, sink: SharedSink) -> Self {
        Self { inner, config, sink }
    }

    fn effective_url(&self) -> String {
        let resolved = self.inner.resolved_url();
        match &self.config.prefer_external_url {
            Some(external) if resolved.contains(&self.config.internal_hostname_marker) => {
                external.clone()
            }
            _ => resolved,
        }
    }

    /// `user_id`/`thread_id` identify who triggered the call for the audit
    /// trail; they are not forwarded to the tool itself.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        args: Value,
        user_id: &str,
        thread_id: Option<&str>,
    ) -> Result<Value, McpToolError> {
        let arg_map: BTreeMap<String, Value> = match &args {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => BTreeMap::new(),
        };

        let url = self.effective_url();
        let started = Instant::now();
        let result = self.inner.call_tool(&url, tool_name, args).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let audit = TelemetryEvent::Audit {
            ts: common::now(),
            operation_type: operation_type(tool_name).to_string(),
            mcp_server: self.inner.server_name().to_string(),
            tool_name: tool_name.to_string(),
            user_id: user_id.to_string(),
            thread_id: thread_id.map(str::to_string),
            sanitized_parameters: sanitize(&arg_map),
            data_accessed: data_accessed(tool_name, &arg_map),
            data_scope: data_scope(tool_name).to_string(),
            result_status: if result.is_ok() { "success" } else { "error" }.to_string(),
            duration_ms,
            compliance_flags: compliance_flags(tool_name, &arg_map),
        };
        self.sink.record(audit).await;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use telemetry::NdjsonFileSink;

    struct StubClient {
        server: String,
        url: String,
        calls: AtomicUsize,
        fail: bool,
        called_with_url: std::sync::Mutex<Option<String>>,
    }

    impl StubClient {
        fn new(server: &str, url: &str, fail: bool) -> Self {
            Self {
                server: server.to_string(),
                url: url.to_string(),
                calls: AtomicUsize::new(0),
                fail,
                called_with_url: std::sync::Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl McpToolClient for StubClient {
        fn server_name(&self) -> &str {
            &self.server
        }
        fn resolved_url(&self) -> String {
            self.url.clone()
        }
        async fn call_tool(&self, url: &str, _tool_name: &str, _args: Value) -> Result<Value, McpToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.called_with_url.lock().unwrap() = Some(url.to_string());
            if self.fail {
                Err(McpToolError::CallFailed("boom".into()))
            } else {
                Ok(json!({"ok": true}))
            }
        }
    }

    #[tokio::test]
    async fn successful_call_emits_one_audit_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink: SharedSink = Arc::new(NdjsonFileSink::new(dir.path()));
        let wrapper = AuditedMcpTool::new(
            StubClient::new("banking-mcp", "http://internal:9000", false),
            AuditedMcpConfig::default(),
            sink,
        );

        let result = wrapper
            .call_tool(
                "get_account_balance",
                json!({"customer_id": "cust-1"}),
                "cust-1",
                Some("thread-1"),
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"ok": true}));
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let content = std::fs::read_to_string(dir.path().join(format!(
            "audit_{}.ndjson",
            chrono::Utc::now().format("%Y-%m-%d")
        )))
        .unwrap();
        assert!(content.contains("get_account_balance"));
        assert!(content.contains("GDPR_PERSONAL_DATA"));
    }

    #[tokio::test]
    async fn failed_call_still_emits_audit_record_and_propagates_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink: SharedSink = Arc::new(NdjsonFileSink::new(dir.path()));
        let wrapper = AuditedMcpTool::new(
            StubClient::new("banking-mcp", "http://internal:9000", true),
            AuditedMcpConfig::default(),
            sink,
        );

        let err = wrapper
            .call_tool("execute_transfer", json!({"amount": 50}), "cust-1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, McpToolError::CallFailed(_)));
    }

    #[test]
    fn external_url_substituted_only_when_internal_marker_present() {
        let config = AuditedMcpConfig {
            prefer_external_url: Some("https://public.example.com".into()),
            internal_hostname_marker: "internal".into(),
        };
        let internal = AuditedMcpTool::new(
            StubClient::new("s", "http://internal-svc:9000", false),
            config.clone(),
            Arc::new(telemetry::NullSink) as SharedSink,
        );
        assert_eq!(internal.effective_url(), "https://public.example.com");

        let external = AuditedMcpTool::new(
            StubClient::new("s", "http://public-svc:9000", false),
            config,
            Arc::new(telemetry::NullSink) as SharedSink,
        );
        assert_eq!(external.effective_url(), "http://public-svc:9000");
    }

    #[tokio::test]
    async fn external_url_override_actually_reaches_call_tool() {
        let config = AuditedMcpConfig {
            prefer_external_url: Some("https://public.example.com".into()),
            internal_hostname_marker: "internal".into(),
        };
        let wrapper = AuditedMcpTool::new(
            StubClient::new("s", "http://internal-svc:9000", false),
            config,
            Arc::new(telemetry::NullSink) as SharedSink,
        );
        wrapper
            .call_tool("get_account_balance", json!({}), "cust-1", None)
            .await
            .unwrap();
        assert_eq!(
            *wrapper.inner.called_with_url.lock().unwrap(),
            Some("https://public.example.com".to_string())
        );
    }
}
