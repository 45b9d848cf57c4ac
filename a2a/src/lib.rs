//! Agent-to-Agent protocol: envelope & codec, circuit breaker,
//! and the discovery-driven send client.

pub mod circuit_breaker;
pub mod client;
pub mod codec;
pub mod message;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::{
    A2aClient, A2aClientConfig, A2aClientError, AgentDirectory, AgentEndpoint, SelectionStrategy,
    SendParams,
};
pub use codec::{decode_message, decode_response, encode_message, encode_response, CodecError};
pub use message::{
    A2aError, A2aMessage, A2aMetadata, A2aResponse, AgentIdentifier, Priority, ResponseStatus,
};
