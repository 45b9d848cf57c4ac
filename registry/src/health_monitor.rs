//! Health Monitor: background probe loop over the registry.

use crate::model::AgentStatus;
use crate::service::RegistryService;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
pub struct HealthMonitorConfig {
    pub check_interval_seconds: u64,
    pub stale_agent_threshold_minutes: i64,
    pub probe_timeout: Duration,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 30,
            stale_agent_threshold_minutes: 5,
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Runs `probe_once` on an interval until the returned handle is dropped or
/// aborted. Probe failures never stop the loop.
pub fn spawn(
    registry: Arc<RegistryService>,
    http: reqwest::Client,
    config: HealthMonitorConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            probe_once(&registry, &http, &config).await;
            tokio::time::sleep(Duration::from_secs(config.check_interval_seconds)).await;
        }
    })
}

async fn probe_one(http: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, http.get(url).send()).await {
        Ok(Ok(resp)) => resp.status().is_success(),
        _ => false,
    }
}

/// One probe pass: concurrent GETs against every agent's health endpoint,
/// status transitions, then stale-agent eviction.
pub async fn probe_once(registry: &RegistryService, http: &reqwest::Client, config: &HealthMonitorConfig) {
    let agents = registry.get_all_agents().await;
    let probes = agents.iter().map(|agent| {
        let url = agent.health_check_url.clone();
        let http = http.clone();
        async move { probe_one(&http, &url, config.probe_timeout).await }
    });
    let results = futures::future::join_all(probes).await;

    let mut healthy = 0usize;
    for (agent, ok) in agents.iter().zip(results.iter()) {
        if *ok {
            healthy += 1;
        }
        let next_status = match (agent.status, *ok) {
            (AgentStatus::Degraded, true) => Some(AgentStatus::Active),
            (AgentStatus::Active, false) => Some(AgentStatus::Degraded),
            _ => None,
        };
        if let Some(status) = next_status {
            if let Err(err) = registry.update_agent_status(&agent.agent_id, status).await {
                tracing::warn!(agent_id = %agent.agent_id, error = %err, "failed to record health transition");
            }
        }
    }
    tracing::info!(healthy, total = agents.len(), "health probe pass complete");

    let threshold = chrono::Duration::minutes(config.stale_agent_threshold_minutes);
    let now = Utc::now();
    for agent in &agents {
        if now.signed_duration_since(agent.last_heartbeat) > threshold {
            tracing::warn!(agent_id = %agent.agent_id, "evicting stale agent");
            if let Err(err) = registry.deregister_agent(&agent.agent_id).await {
                tracing::warn!(agent_id = %agent.agent_id, error = %err, "failed to evict stale agent");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentDiscoveryRequest, AgentEndpoints, AgentRegistrationRequest, AgentType};
    use crate::store::{FileDurableStore, InMemoryHotIndex};
    use std::collections::{BTreeMap, HashSet};

    async fn registry_with_agent(health_url: &str, status: AgentStatus) -> (RegistryService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let hot = Arc::new(InMemoryHotIndex::new(Duration::from_secs(300)));
        let durable = Arc::new(FileDurableStore::new(dir.path()));
        let svc = RegistryService::new(hot, Some(durable));
        let agent = svc
            .register_agent(AgentRegistrationRequest {
                agent_name: "AccountAgent".into(),
                agent_type: AgentType::Domain,
                version: "1.0".into(),
                capabilities: HashSet::from(["account.balance".to_string()]),
                capabilities_detailed: BTreeMap::new(),
                endpoints: AgentEndpoints {
                    http: "http://localhost".into(),
                    health: health_url.to_string(),
                    metrics: None,
                    a2a: "http://localhost/a2a/invoke".into(),
                },
                metadata: BTreeMap::new(),
                tags: HashSet::new(),
            })
            .await
            .unwrap();
        svc.update_agent_status(&agent.agent_id, status).await.unwrap();
        (svc, dir)
    }

    #[tokio::test]
    async fn unreachable_active_agent_becomes_degraded() {
        let (svc, _dir) = registry_with_agent("http://127.0.0.1:1/health", AgentStatus::Active).await;
        let config = HealthMonitorConfig {
            probe_timeout: Duration::from_millis(200),
            ..Default::default()
        };
        probe_once(&svc, &reqwest::Client::new(), &config).await;
        let agents = svc
            .discover_agents(&AgentDiscoveryRequest::default())
            .await;
        assert_eq!(agents[0].status, AgentStatus::Degraded);
    }

    #[tokio::test]
    async fn stale_agent_is_evicted() {
        let (svc, _dir) = registry_with_agent("http://127.0.0.1:1/health", AgentStatus::Active).await;
        let mut agent = svc.get_all_agents().await.into_iter().next().unwrap();
        agent.last_heartbeat = Utc::now() - chrono::Duration::hours(1);
        let hot = Arc::new(InMemoryHotIndex::new(Duration::from_secs(300)));
        let dir = tempfile::tempdir().unwrap();
        let durable = Arc::new(FileDurableStore::new(dir.path()));
        crate::store::HotIndex::set(&*hot, agent.clone()).await.unwrap();
        crate::store::DurableStore::put(&*durable, &agent).await.unwrap();
        let svc2 = RegistryService::new(hot, Some(durable));

        let config = HealthMonitorConfig {
            probe_timeout: Duration::from_millis(200),
            stale_agent_threshold_minutes: 5,
            ..Default::default()
        };
        probe_once(&svc2, &reqwest::Client::new(), &config).await;
        assert!(svc2.get_agent(&agent.agent_id).await.is_none());
    }
}
