//! The fixed set of specialist agents the Supervisor can route to.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingAgent {
    AiMoneyCoach,
    ProductInfo,
    Transaction,
    Payment,
    Account,
    Escalation,
}

impl RoutingAgent {
    pub const ALL: [RoutingAgent; 6] = [
        RoutingAgent::AiMoneyCoach,
        RoutingAgent::ProductInfo,
        RoutingAgent::Transaction,
        RoutingAgent::Payment,
        RoutingAgent::Account,
        RoutingAgent::Escalation,
    ];

    /// Display name matching the closed set the routing classifier must
    /// return from.
    pub fn display_name(&self) -> &'static str {
        match self {
            RoutingAgent::AiMoneyCoach => "AI Money Coach",
            RoutingAgent::ProductInfo => "Product Info Agent",
            RoutingAgent::Transaction => "Transaction Agent",
            RoutingAgent::Payment => "Payment Agent",
            RoutingAgent::Account => "Account Agent",
            RoutingAgent::Escalation => "Escalation Agent",
        }
    }

    /// A2A discovery capability this agent registers under.
    pub fn capability(&self) -> &'static str {
        match self {
            RoutingAgent::AiMoneyCoach => "money_coach",
            RoutingAgent::ProductInfo => "product_faq",
            RoutingAgent::Transaction => "transactions",
            RoutingAgent::Payment => "payments",
            RoutingAgent::Account => "accounts",
            RoutingAgent::Escalation => "escalation",
        }
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.display_name().eq_ignore_ascii_case(name))
    }
}
