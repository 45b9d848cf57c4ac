//! The domain tool calls a cache `initialize` composes. Kept as
//! a trait since the account/transaction/payment MCP tools are out of scope.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("upstream tool call failed: {0}")]
    ToolCall(String),
}

#[async_trait]
pub trait UserDataSource: Send + Sync {
    async fn primary_account(&self, user_email: &str) -> Result<Value, SourceError>;
    async fn recent_transactions(&self, account_id: &str, limit: u32) -> Result<Value, SourceError>;
    async fn beneficiaries(&self, account_id: &str) -> Result<Value, SourceError>;
    async fn limits(&self, account_id: &str) -> Result<Value, SourceError>;
}
