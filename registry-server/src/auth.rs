//! JWT bearer auth for mutating registry routes (`jwt_secret`/
//! `jwt_algorithm`/`jwt_expiration_seconds`).

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub admin: bool,
    pub exp: i64,
}

impl Claims {
    /// True if these claims authorize a mutating call against `target_agent_id`:
    /// the token's own subject, or an admin-scoped token.
    pub fn authorizes(&self, target_agent_id: &str) -> bool {
        self.admin || self.sub == target_agent_id
    }
}

#[derive(Debug, Clone)]
pub struct JwtAuth {
    pub enabled: bool,
    pub secret: String,
    pub algorithm: Algorithm,
    pub expiration_seconds: i64,
}

impl JwtAuth {
    pub fn issue(&self, subject: &str, admin: bool) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: subject.to_string(),
            admin,
            exp: (chrono::Utc::now() + chrono::Duration::seconds(self.expiration_seconds)).timestamp(),
        };
        encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(self.algorithm),
        )?;
        Ok(data.claims)
    }
}

/// Extracted on protected routes; `None` when auth is disabled so handlers
/// can skip the check entirely without a second code path.
pub struct AuthedCaller(pub Option<Claims>);

#[async_trait]
impl FromRequestParts<Arc<super::AppState>> for AuthedCaller {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<super::AppState>,
    ) -> Result<Self, Self::Rejection> {
        if !state.jwt.enabled {
            return Ok(AuthedCaller(None));
        }
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing bearer token"))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or((StatusCode::UNAUTHORIZED, "malformed authorization header"))?;
        let claims = state
            .jwt
            .verify(token)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid or expired token"))?;
        Ok(AuthedCaller(Some(claims)))
    }
}
