//! Agent Registry: store, service, health monitor.

pub mod health_monitor;
pub mod model;
pub mod service;
pub mod store;

pub use health_monitor::{spawn as spawn_health_monitor, HealthMonitorConfig};
pub use model::{
    AgentDiscoveryRequest, AgentEndpoints, AgentRegistration, AgentRegistrationRequest,
    AgentStatus, AgentType,
};
pub use service::{RegistryError, RegistryService};
pub use store::{DurableStore, FileDurableStore, HotIndex, InMemoryHotIndex, StoreError};
