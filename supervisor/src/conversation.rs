//! Conversation State: dual-indexed by `session_id` and
//! `customer_id` so a later session for the same customer can resume an
//! `active_agent` for cross-session continuation fallback.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ActiveAgent {
    pub name: String,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: String,
    pub content: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub customer_id: String,
    pub session_id: String,
    pub active_agent: Option<ActiveAgent>,
    pub messages: Vec<Message>,
}

/// Holds every `Session`, indexed both ways. Both indexes are updated
/// together on every mutation ("must maintain both indexes
/// consistently").
pub struct ConversationState {
    by_session: DashMap<String, Session>,
    by_customer: DashMap<String, String>,
    /// Per-session turn serialization: turns for a given session_id are
    /// processed one at a time.
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            by_session: DashMap::new(),
            by_customer: DashMap::new(),
            turn_locks: DashMap::new(),
        }
    }

    pub fn create_session(&self, customer_id: &str) -> String {
        let session_id = common::new_session_id();
        self.by_session.insert(
            session_id.clone(),
            Session {
                customer_id: customer_id.to_string(),
                session_id: session_id.clone(),
                active_agent: None,
                messages: Vec::new(),
            },
        );
        self.by_customer.insert(customer_id.to_string(), session_id.clone());
        session_id
    }

    pub fn lock_for_turn(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.turn_locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub fn set_active_agent(&self, session_id: &str, name: &str, endpoint: &str) {
        if let Some(mut session) = self.by_session.get_mut(session_id) {
            session.active_agent = Some(ActiveAgent {
                name: name.to_string(),
                endpoint: endpoint.to_string(),
            });
            self.by_customer
                .insert(session.customer_id.clone(), session_id.to_string());
        }
    }

    pub fn get_active_agent(&self, session_id: &str) -> Option<ActiveAgent> {
        self.by_session.get(session_id)?.active_agent.clone()
    }

    /// Cross-session fallback : when no `active_agent` is set for
    /// `session_id`, fall back to the customer's most recently active
    /// session.
    pub fn get_active_agent_for_customer(
        &self,
        customer_id: &str,
    ) -> Option<(String, ActiveAgent)> {
        let session_id = self.by_customer.get(customer_id)?.clone();
        let agent = self.by_session.get(&session_id)?.active_agent.clone()?;
        Some((session_id, agent))
    }

    pub fn add_message(&self, session_id: &str, role: &str, content: &str) {
        if let Some(mut session) = self.by_session.get_mut(session_id) {
            session.messages.push(Message {
                role: role.to_string(),
                content: content.to_string(),
                at: Utc::now(),
            });
        }
    }

    pub fn history(&self, session_id: &str) -> Vec<Message> {
        self.by_session
            .get(session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    pub fn customer_id_for(&self, session_id: &str) -> Option<String> {
        self.by_session.get(session_id).map(|s| s.customer_id.clone())
    }

    pub fn end_session(&self, session_id: &str) {
        if let Some((_, session)) = self.by_session.remove(session_id) {
            if self.by_customer.get(&session.customer_id).map(|v| v.clone()).as_deref()
                == Some(session_id)
            {
                self.by_customer.remove(&session.customer_id);
            }
        }
        self.turn_locks.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_active_agent_updates_both_indexes() {
        let state = ConversationState::new();
        let session_id = state.create_session("cust-1");
        state.set_active_agent(&session_id, "Payment Agent", "http://payment");

        assert_eq!(state.get_active_agent(&session_id).unwrap().name, "Payment Agent");
        let (found_session, agent) = state.get_active_agent_for_customer("cust-1").unwrap();
        assert_eq!(found_session, session_id);
        assert_eq!(agent.name, "Payment Agent");
    }

    #[test]
    fn end_session_clears_both_indexes() {
        let state = ConversationState::new();
        let session_id = state.create_session("cust-1");
        state.end_session(&session_id);
        assert!(state.get_active_agent(&session_id).is_none());
        assert!(state.get_active_agent_for_customer("cust-1").is_none());
    }

    #[test]
    fn add_message_appends_to_session_history() {
        let state = ConversationState::new();
        let session_id = state.create_session("cust-1");
        state.add_message(&session_id, "user", "hello");
        assert_eq!(state.history(&session_id).len(), 1);
    }
}
