//! Pluggable opaque-bearer-token verification: tokens are opaque bearer
//! strings validated by a pluggable verifier.
//!
//! The identity provider itself is out of scope; this crate only defines the
//! seam a concrete verifier (JWT-backed, or a test double) plugs into.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("malformed bearer token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

/// Claims a verified token carries. `agent_id` binds a registry token to the
/// agent it was issued for ; `admin` carries the admin scope that
/// lets a caller act on any agent_id path parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerClaims {
    pub agent_id: String,
    pub admin: bool,
}

impl BearerClaims {
    /// True if these claims authorize a mutating call against `target_agent_id`.
    pub fn authorizes(&self, target_agent_id: &str) -> bool {
        self.admin || self.agent_id == target_agent_id
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<BearerClaims, AuthError>;
}

/// Verifier that accepts any non-empty token and treats it as an admin
/// token. Useful for local development and for components that run with
/// `auth_enabled=false`.
pub struct AllowAllVerifier;

#[async_trait]
impl TokenVerifier for AllowAllVerifier {
    async fn verify(&self, token: &str) -> Result<BearerClaims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        Ok(BearerClaims {
            agent_id: token.to_string(),
            admin: true,
        })
    }
}
