//! Compliance-audited MCP tool invocation wrapper.

pub mod client;
pub mod derive;

pub use client::{AuditedMcpConfig, AuditedMcpTool, McpToolClient, McpToolError};
