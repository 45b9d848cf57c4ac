//! Static `AgentDirectory` backed by the `SUPERVISOR_AGENT_URL_*` config
//! section, used when the supervisor dispatches directly to specialist
//! agents without going through the registry service.

use a2a::{AgentDirectory, AgentEndpoint};
use async_trait::async_trait;
use config::{AgentUrls, SupervisorConfig};
use supervisor::RoutingAgent;

pub struct StaticDirectory {
    config: SupervisorConfig,
}

impl StaticDirectory {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    fn url_for(&self, capability: &str) -> Option<(&'static str, &str)> {
        let urls: &AgentUrls = &self.config.agent_a2a_urls;
        let (enabled, name, url) = match capability {
            "money_coach" => (self.config.enable_a2a_ai_coach, "AI Money Coach", &urls.ai_coach),
            "product_faq" => (self.config.enable_a2a_prodinfo, "Product Info Agent", &urls.prodinfo),
            "transactions" => (self.config.enable_a2a_transaction, "Transaction Agent", &urls.transaction),
            "payments" => (self.config.enable_a2a_payment, "Payment Agent", &urls.payment),
            "accounts" => (self.config.enable_a2a_account, "Account Agent", &urls.account),
            "escalation" => (self.config.enable_a2a_escalation, "Escalation Agent", &urls.escalation),
            _ => return None,
        };
        if enabled {
            Some((name, url))
        } else {
            None
        }
    }
}

#[async_trait]
impl AgentDirectory for StaticDirectory {
    async fn discover_by_capability(&self, capability: &str) -> Vec<AgentEndpoint> {
        match self.url_for(capability) {
            Some((name, url)) => vec![AgentEndpoint {
                agent_id: capability.to_string(),
                agent_name: name.to_string(),
                a2a_url: url.to_string(),
            }],
            None => vec![],
        }
    }

    async fn get_agent(&self, agent_id: &str) -> Option<AgentEndpoint> {
        RoutingAgent::ALL
            .into_iter()
            .find(|agent| agent.capability() == agent_id)
            .and_then(|agent| self.url_for(agent.capability()))
            .map(|(name, url)| AgentEndpoint {
                agent_id: agent_id.to_string(),
                agent_name: name.to_string(),
                a2a_url: url.to_string(),
            })
    }
}
