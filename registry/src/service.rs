//! Registry Service: register / discover / heartbeat /
//! update_status / deregister, built over the two-tier store.

use crate::model::{
    AgentDiscoveryRequest, AgentEndpoints, AgentRegistration, AgentRegistrationRequest,
    AgentStatus, AgentType,
};
use crate::store::{filter_by_tags, DurableStore, HotIndex};
use a2a::{AgentDirectory, AgentEndpoint};
use async_trait::async_trait;
use chrono::Utc;
use common::new_agent_id;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("agent not found: {0}")]
    NotFound(String),
    #[error("durable store error: {0}")]
    Durable(#[from] crate::store::StoreError),
}

/// Registers/discovers/heartbeats agents, keeping the hot index and durable
/// store consistent: reads go hot, then durable on miss with hot
/// repopulation; writes go to both tiers.
pub struct RegistryService {
    hot: Arc<dyn HotIndex>,
    durable: Option<Arc<dyn DurableStore>>,
    /// One write lock per `agent_id`: per-agent writes must be serialized
    /// to avoid index divergence between the two tiers.
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RegistryService {
    pub fn new(hot: Arc<dyn HotIndex>, durable: Option<Arc<dyn DurableStore>>) -> Self {
        Self {
            hot,
            durable,
            write_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, agent_id: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn register_agent(
        &self,
        request: AgentRegistrationRequest,
    ) -> Result<AgentRegistration, RegistryError> {
        let now = Utc::now();
        let agent = AgentRegistration {
            agent_id: new_agent_id(),
            agent_name: request.agent_name,
            agent_type: request.agent_type,
            version: request.version,
            capabilities: request.capabilities,
            capabilities_detailed: request.capabilities_detailed,
            health_check_url: request.endpoints.health.clone(),
            endpoints: request.endpoints,
            metadata: request.metadata,
            tags: request.tags,
            status: AgentStatus::Active,
            registered_at: now,
            last_heartbeat: now,
        };

        let lock = self.lock_for(&agent.agent_id);
        let _guard = lock.lock().await;
        if let Err(err) = self.hot.set(agent.clone()).await {
            tracing::warn!(agent_id = %agent.agent_id, error = %err, "hot index write failed on register");
        }
        if let Some(durable) = &self.durable {
            durable.put(&agent).await?;
        }
        tracing::info!(agent_id = %agent.agent_id, agent_name = %agent.agent_name, "registered agent");
        Ok(agent)
    }

    pub async fn get_agent(&self, agent_id: &str) -> Option<AgentRegistration> {
        if let Some(agent) = self.hot.get(agent_id).await {
            return Some(agent);
        }
        let durable = self.durable.as_ref()?;
        let agent = durable.get(agent_id).await.ok().flatten()?;
        if let Err(err) = self.hot.set(agent.clone()).await {
            tracing::warn!(agent_id, error = %err, "failed to repopulate hot index");
        }
        Some(agent)
    }

    pub async fn discover_agents(
        &self,
        request: &AgentDiscoveryRequest,
    ) -> Vec<AgentRegistration> {
        let mut agents = self
            .hot
            .find(
                request.capability.as_deref(),
                request.agent_type,
                request.status,
            )
            .await;

        if agents.is_empty() {
            if let Some(durable) = &self.durable {
                match durable
                    .query(request.capability.as_deref(), request.agent_type, request.status)
                    .await
                {
                    Ok(found) => {
                        for agent in &found {
                            if let Err(err) = self.hot.set(agent.clone()).await {
                                tracing::warn!(error = %err, "failed to repopulate hot index from durable query");
                            }
                        }
                        agents = found;
                    }
                    Err(err) => tracing::warn!(error = %err, "durable discovery query failed"),
                }
            }
        }

        filter_by_tags(agents, &request.tags)
    }

    pub async fn update_heartbeat(
        &self,
        agent_id: &str,
        status: Option<AgentStatus>,
    ) -> Result<Option<chrono::DateTime<Utc>>, RegistryError> {
        let lock = self.lock_for(agent_id);
        let _guard = lock.lock().await;
        let Some(mut agent) = self.get_agent(agent_id).await else {
            return Ok(None);
        };
        agent.last_heartbeat = Utc::now();
        if let Some(status) = status {
            agent.status = status;
        }
        if let Err(err) = self.hot.set(agent.clone()).await {
            tracing::warn!(agent_id, error = %err, "hot index write failed on heartbeat");
        }
        if let Some(durable) = &self.durable {
            durable.put(&agent).await?;
        }
        Ok(Some(agent.last_heartbeat))
    }

    pub async fn update_agent_status(
        &self,
        agent_id: &str,
        status: AgentStatus,
    ) -> Result<bool, RegistryError> {
        let lock = self.lock_for(agent_id);
        let _guard = lock.lock().await;
        let Some(mut agent) = self.get_agent(agent_id).await else {
            return Ok(false);
        };
        agent.status = status;
        if let Err(err) = self.hot.set(agent.clone()).await {
            tracing::warn!(agent_id, error = %err, "hot index write failed on status update");
        }
        if let Some(durable) = &self.durable {
            durable.put(&agent).await?;
        }
        tracing::info!(agent_id, status = status.as_str(), "updated agent status");
        Ok(true)
    }

    /// Idempotent: a second call for an unknown agent is a no-op success
    /// A second call for an unknown agent is a no-op success.
    pub async fn deregister_agent(&self, agent_id: &str) -> Result<(), RegistryError> {
        let lock = self.lock_for(agent_id);
        let _guard = lock.lock().await;
        self.hot.delete(agent_id).await;
        if let Some(durable) = &self.durable {
            durable.delete(agent_id).await?;
        }
        tracing::info!(agent_id, "deregistered agent");
        Ok(())
    }

    pub async fn get_all_agents(&self) -> Vec<AgentRegistration> {
        if let Some(durable) = &self.durable {
            if let Ok(agents) = durable.get_all().await {
                return agents;
            }
        }
        self.hot.find(None, None, None).await
    }

    /// Probes both tiers directly so `/health` can report unreachable
    /// instead of the hot-index fallback `get_all_agents` uses masking a
    /// durable-store failure.
    pub async fn check_reachable(&self) -> Result<(), RegistryError> {
        self.hot.set(health_probe_agent()).await?;
        self.hot.delete(HEALTH_PROBE_AGENT_ID).await;
        if let Some(durable) = &self.durable {
            durable.get(HEALTH_PROBE_AGENT_ID).await?;
        }
        Ok(())
    }
}

const HEALTH_PROBE_AGENT_ID: &str = "__health_probe__";

fn health_probe_agent() -> AgentRegistration {
    let now = Utc::now();
    AgentRegistration {
        agent_id: HEALTH_PROBE_AGENT_ID.to_string(),
        agent_name: "health-probe".to_string(),
        agent_type: AgentType::Utility,
        version: "0".to_string(),
        capabilities: Default::default(),
        capabilities_detailed: Default::default(),
        endpoints: AgentEndpoints {
            http: String::new(),
            health: String::new(),
            metrics: None,
            a2a: String::new(),
        },
        health_check_url: String::new(),
        metadata: Default::default(),
        tags: Default::default(),
        status: AgentStatus::Inactive,
        registered_at: now,
        last_heartbeat: now,
    }
}

fn to_endpoint(agent: AgentRegistration) -> AgentEndpoint {
    AgentEndpoint {
        agent_id: agent.agent_id,
        agent_name: agent.agent_name,
        a2a_url: agent.endpoints.a2a,
    }
}

/// Lets the A2A client discover targets through the registry
/// without `a2a` depending on `registry`.
#[async_trait]
impl AgentDirectory for RegistryService {
    async fn discover_by_capability(&self, capability: &str) -> Vec<AgentEndpoint> {
        let request = AgentDiscoveryRequest {
            capability: Some(capability.to_string()),
            ..AgentDiscoveryRequest::default_active()
        };
        self.discover_agents(&request)
            .await
            .into_iter()
            .map(to_endpoint)
            .collect()
    }

    async fn get_agent(&self, agent_id: &str) -> Option<AgentEndpoint> {
        RegistryService::get_agent(self, agent_id).await.map(to_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AgentEndpoints;
    use crate::model::AgentType;
    use crate::store::{FileDurableStore, InMemoryHotIndex};
    use std::collections::{BTreeMap, HashSet};
    use std::time::Duration;

    fn service() -> (RegistryService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let hot = Arc::new(InMemoryHotIndex::new(Duration::from_secs(300)));
        let durable = Arc::new(FileDurableStore::new(dir.path()));
        (RegistryService::new(hot, Some(durable)), dir)
    }

    fn registration_request(capability: &str) -> AgentRegistrationRequest {
        AgentRegistrationRequest {
            agent_name: "AccountAgent".to_string(),
            agent_type: AgentType::Domain,
            version: "1.0".to_string(),
            capabilities: HashSet::from([capability.to_string()]),
            capabilities_detailed: BTreeMap::new(),
            endpoints: AgentEndpoints {
                http: "http://localhost:8101".into(),
                health: "http://localhost:8101/health".into(),
                metrics: None,
                a2a: "http://localhost:8101/a2a/invoke".into(),
            },
            metadata: BTreeMap::new(),
            tags: HashSet::new(),
        }
    }

    #[tokio::test]
    async fn register_discover_get_round_trip() {
        let (svc, _dir) = service();
        let agent = svc
            .register_agent(registration_request("account.balance"))
            .await
            .unwrap();

        let discovered = svc
            .discover_agents(&AgentDiscoveryRequest {
                capability: Some("account.balance".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].agent_id, agent.agent_id);

        let fetched = svc.get_agent(&agent.agent_id).await.unwrap();
        assert_eq!(fetched.agent_name, agent.agent_name);
    }

    #[tokio::test]
    async fn deregister_then_discover_returns_nothing() {
        let (svc, _dir) = service();
        let agent = svc
            .register_agent(registration_request("account.balance"))
            .await
            .unwrap();
        svc.deregister_agent(&agent.agent_id).await.unwrap();
        let discovered = svc
            .discover_agents(&AgentDiscoveryRequest {
                capability: Some("account.balance".to_string()),
                ..Default::default()
            })
            .await;
        assert!(discovered.is_empty());
    }

    #[tokio::test]
    async fn deregister_is_idempotent() {
        let (svc, _dir) = service();
        svc.deregister_agent("unknown-agent").await.unwrap();
        svc.deregister_agent("unknown-agent").await.unwrap();
    }

    #[tokio::test]
    async fn check_reachable_succeeds_when_both_tiers_are_up() {
        let (svc, _dir) = service();
        svc.check_reachable().await.unwrap();
    }

    #[tokio::test]
    async fn check_reachable_fails_when_durable_store_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let hot = Arc::new(InMemoryHotIndex::new(Duration::from_secs(300)));
        // A file in place of the durable store's directory makes every
        // durable read/write fail with a "not a directory" io error.
        let blocked_path = dir.path().join("blocked");
        std::fs::write(&blocked_path, b"not a directory").unwrap();
        let durable = Arc::new(FileDurableStore::new(blocked_path.join("sub")));
        let svc = RegistryService::new(hot, Some(durable));
        assert!(svc.check_reachable().await.is_err());
    }

    #[tokio::test]
    async fn discover_by_capability_only_returns_agents_with_it_and_active_status() {
        let (svc, _dir) = service();
        let a = svc
            .register_agent(registration_request("account.balance"))
            .await
            .unwrap();
        svc.update_agent_status(&a.agent_id, AgentStatus::Degraded)
            .await
            .unwrap();

        let discovered = svc.discover_agents(&AgentDiscoveryRequest::default_active()).await;
        assert!(discovered.iter().all(|agent| agent.status == AgentStatus::Active));
    }
}
