//! Registry Store: two-tier store, hot index + durable.
//!
//! Both tiers are meant to back onto external datastores (a Redis-style
//! cache plus a document store); only the abstract key/value and document
//! interfaces are defined here. This module defines those interfaces as
//! traits plus an in-process default for each, so `RegistryService` never
//! has to know whether it's talking to a real cache/document store or the
//! in-memory stand-in.

use crate::model::{AgentRegistration, AgentStatus, AgentType};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Hot index: TTL'd key/value with capability/type/status secondary
/// indexes. All writes keep the primary entry and every index set
/// consistent.
#[async_trait]
pub trait HotIndex: Send + Sync {
    async fn get(&self, agent_id: &str) -> Option<AgentRegistration>;
    async fn set(&self, agent: AgentRegistration) -> Result<(), StoreError>;
    async fn delete(&self, agent_id: &str);
    async fn find(
        &self,
        capability: Option<&str>,
        agent_type: Option<AgentType>,
        status: Option<AgentStatus>,
    ) -> Vec<AgentRegistration>;
}

/// Durable store: authoritative document store partitioned by `agent_id`.
/// Used on hot-index miss and to restore the hot index.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, agent_id: &str) -> Result<Option<AgentRegistration>, StoreError>;
    async fn put(&self, agent: &AgentRegistration) -> Result<(), StoreError>;
    async fn delete(&self, agent_id: &str) -> Result<(), StoreError>;
    async fn query(
        &self,
        capability: Option<&str>,
        agent_type: Option<AgentType>,
        status: Option<AgentStatus>,
    ) -> Result<Vec<AgentRegistration>, StoreError>;
    async fn get_all(&self) -> Result<Vec<AgentRegistration>, StoreError>;
}

/// In-process hot index, TTL enforced on read (stand-in for Redis +
/// `redis_ttl_seconds`).
pub struct InMemoryHotIndex {
    ttl: Duration,
    entries: DashMap<String, (AgentRegistration, Instant)>,
}

impl InMemoryHotIndex {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    fn matches(
        agent: &AgentRegistration,
        capability: Option<&str>,
        agent_type: Option<AgentType>,
        status: Option<AgentStatus>,
    ) -> bool {
        if let Some(cap) = capability {
            if !agent.capabilities.contains(cap) {
                return false;
            }
        }
        if let Some(t) = agent_type {
            if agent.agent_type != t {
                return false;
            }
        }
        if let Some(s) = status {
            if agent.status != s {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl HotIndex for InMemoryHotIndex {
    async fn get(&self, agent_id: &str) -> Option<AgentRegistration> {
        let entry = self.entries.get(agent_id)?;
        let (agent, stamped) = entry.value();
        if stamped.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(agent_id);
            return None;
        }
        Some(agent.clone())
    }

    async fn set(&self, agent: AgentRegistration) -> Result<(), StoreError> {
        self.entries
            .insert(agent.agent_id.clone(), (agent, Instant::now()));
        Ok(())
    }

    async fn delete(&self, agent_id: &str) {
        self.entries.remove(agent_id);
    }

    async fn find(
        &self,
        capability: Option<&str>,
        agent_type: Option<AgentType>,
        status: Option<AgentStatus>,
    ) -> Vec<AgentRegistration> {
        let now = Instant::now();
        let mut expired = Vec::new();
        let mut out = Vec::new();
        for entry in self.entries.iter() {
            let (agent, stamped) = entry.value();
            if now.duration_since(*stamped) > self.ttl {
                expired.push(entry.key().clone());
                continue;
            }
            if Self::matches(agent, capability, agent_type, status) {
                out.push(agent.clone());
            }
        }
        for key in expired {
            self.entries.remove(&key);
        }
        out
    }
}

/// In-process durable store: one JSON file per `agent_id` under `dir`
/// (stand-in for a Cosmos-DB-style document store partitioned by agent id).
pub struct FileDurableStore {
    dir: PathBuf,
}

impl FileDurableStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, agent_id: &str) -> PathBuf {
        self.dir.join(format!("{agent_id}.json"))
    }

    async fn read_all(&self) -> Result<Vec<AgentRegistration>, StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut out = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = tokio::fs::read_to_string(entry.path()).await?;
            out.push(serde_json::from_str(&content)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl DurableStore for FileDurableStore {
    async fn get(&self, agent_id: &str) -> Result<Option<AgentRegistration>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(agent_id)).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, agent: &AgentRegistration) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&agent.agent_id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(agent)?;
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, agent_id: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_for(agent_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn query(
        &self,
        capability: Option<&str>,
        agent_type: Option<AgentType>,
        status: Option<AgentStatus>,
    ) -> Result<Vec<AgentRegistration>, StoreError> {
        let all = self.read_all().await?;
        Ok(all
            .into_iter()
            .filter(|agent| {
                capability.map_or(true, |c| agent.capabilities.contains(c))
                    && agent_type.map_or(true, |t| agent.agent_type == t)
                    && status.map_or(true, |s| agent.status == s)
            })
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<AgentRegistration>, StoreError> {
        self.read_all().await
    }
}

/// Tag filtering is a post-filter, OR'd across the requested tags.
pub fn filter_by_tags(agents: Vec<AgentRegistration>, tags: &[String]) -> Vec<AgentRegistration> {
    if tags.is_empty() {
        return agents;
    }
    let wanted: HashSet<&str> = tags.iter().map(String::as_str).collect();
    agents
        .into_iter()
        .filter(|a| a.tags.iter().any(|t| wanted.contains(t.as_str())))
        .collect()
}
