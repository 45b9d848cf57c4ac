//! Typed, per-component configuration sections.
//!
//! Each section is loaded from process environment variables with documented
//! defaults. Call [`load_and_apply`](crate::load_and_apply) first if `.env`
//! or XDG values should seed the environment.

use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SectionError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

fn env_str(key: &'static str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &'static str) -> Option<String> {
    env::var(key).ok()
}

fn env_parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, SectionError> {
    match env::var(key) {
        Ok(v) => v.parse().map_err(|_| SectionError::Invalid { key, value: v }),
        Err(_) => Ok(default),
    }
}

fn env_bool(key: &'static str, default: bool) -> Result<bool, SectionError> {
    match env::var(key) {
        Ok(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(SectionError::Invalid { key, value: v }),
        },
        Err(_) => Ok(default),
    }
}

/// Registry service configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub redis_url: Option<String>,
    pub redis_ttl_seconds: u64,
    pub durable_endpoint: Option<String>,
    pub durable_key: Option<String>,
    pub health_check_enabled: bool,
    pub health_check_interval_seconds: u64,
    pub stale_agent_threshold_minutes: u64,
    pub auth_enabled: bool,
    pub jwt_secret: Option<String>,
    pub jwt_algorithm: String,
    pub jwt_expiration_seconds: u64,
}

impl RegistryConfig {
    pub fn from_env() -> Result<Self, SectionError> {
        let auth_enabled = env_bool("REGISTRY_AUTH_ENABLED", true)?;
        let jwt_secret = env_opt("REGISTRY_JWT_SECRET");
        if auth_enabled && jwt_secret.is_none() {
            return Err(SectionError::Missing("REGISTRY_JWT_SECRET"));
        }
        Ok(Self {
            redis_url: env_opt("REGISTRY_REDIS_URL"),
            redis_ttl_seconds: env_parsed("REGISTRY_REDIS_TTL_SECONDS", 300)?,
            durable_endpoint: env_opt("REGISTRY_DURABLE_ENDPOINT"),
            durable_key: env_opt("REGISTRY_DURABLE_KEY"),
            health_check_enabled: env_bool("REGISTRY_HEALTH_CHECK_ENABLED", true)?,
            health_check_interval_seconds: env_parsed(
                "REGISTRY_HEALTH_CHECK_INTERVAL_SECONDS",
                30,
            )?,
            stale_agent_threshold_minutes: env_parsed(
                "REGISTRY_STALE_AGENT_THRESHOLD_MINUTES",
                5,
            )?,
            auth_enabled,
            jwt_secret,
            jwt_algorithm: env_str("REGISTRY_JWT_ALGORITHM", "HS256"),
            jwt_expiration_seconds: env_parsed("REGISTRY_JWT_EXPIRATION_SECONDS", 3600)?,
        })
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_seconds)
    }

    pub fn stale_agent_threshold(&self) -> Duration {
        Duration::from_secs(self.stale_agent_threshold_minutes * 60)
    }
}

/// A2A client configuration.
#[derive(Debug, Clone)]
pub struct A2aConfig {
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_backoff_seconds: u64,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_timeout_seconds: u64,
    pub enable_tracing: bool,
}

impl A2aConfig {
    pub fn from_env() -> Result<Self, SectionError> {
        Ok(Self {
            timeout_seconds: env_parsed("A2A_TIMEOUT_SECONDS", 30)?,
            max_retries: env_parsed("A2A_MAX_RETRIES", 3)?,
            retry_backoff_seconds: env_parsed("A2A_RETRY_BACKOFF_SECONDS", 2)?,
            circuit_breaker_threshold: env_parsed("A2A_CIRCUIT_BREAKER_THRESHOLD", 5)?,
            circuit_breaker_timeout_seconds: env_parsed(
                "A2A_CIRCUIT_BREAKER_TIMEOUT_SECONDS",
                60,
            )?,
            enable_tracing: env_bool("A2A_ENABLE_TRACING", true)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// User cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_dir: String,
    pub ttl_seconds: u64,
    pub cleanup_age_seconds: u64,
}

impl CacheConfig {
    pub fn from_env() -> Result<Self, SectionError> {
        Ok(Self {
            cache_dir: env_str("CACHE_DIR", "/tmp/banking-fabric/user-cache"),
            ttl_seconds: env_parsed("CACHE_TTL_SECONDS", 300)?,
            cleanup_age_seconds: env_parsed("CACHE_CLEANUP_AGE_SECONDS", 3600)?,
        })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct AgentUrls {
    pub account: String,
    pub transaction: String,
    pub payment: String,
    pub prodinfo: String,
    pub ai_coach: String,
    pub escalation: String,
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub llm_endpoint: Option<String>,
    pub llm_mini_deployment: Option<String>,
    pub agent_a2a_urls: AgentUrls,
    pub enable_a2a_account: bool,
    pub enable_a2a_transaction: bool,
    pub enable_a2a_payment: bool,
    pub enable_a2a_prodinfo: bool,
    pub enable_a2a_ai_coach: bool,
    pub enable_a2a_escalation: bool,
}

impl SupervisorConfig {
    pub fn from_env() -> Result<Self, SectionError> {
        Ok(Self {
            llm_endpoint: env_opt("SUPERVISOR_LLM_ENDPOINT"),
            llm_mini_deployment: env_opt("SUPERVISOR_LLM_MINI_DEPLOYMENT"),
            agent_a2a_urls: AgentUrls {
                account: env_str("SUPERVISOR_AGENT_URL_ACCOUNT", "http://localhost:8101"),
                transaction: env_str(
                    "SUPERVISOR_AGENT_URL_TRANSACTION",
                    "http://localhost:8102",
                ),
                payment: env_str("SUPERVISOR_AGENT_URL_PAYMENT", "http://localhost:8103"),
                prodinfo: env_str("SUPERVISOR_AGENT_URL_PRODINFO", "http://localhost:8104"),
                ai_coach: env_str("SUPERVISOR_AGENT_URL_AI_COACH", "http://localhost:8105"),
                escalation: env_str("SUPERVISOR_AGENT_URL_ESCALATION", "http://localhost:8106"),
            },
            enable_a2a_account: env_bool("SUPERVISOR_ENABLE_A2A_ACCOUNT", true)?,
            enable_a2a_transaction: env_bool("SUPERVISOR_ENABLE_A2A_TRANSACTION", true)?,
            enable_a2a_payment: env_bool("SUPERVISOR_ENABLE_A2A_PAYMENT", true)?,
            enable_a2a_prodinfo: env_bool("SUPERVISOR_ENABLE_A2A_PRODINFO", true)?,
            enable_a2a_ai_coach: env_bool("SUPERVISOR_ENABLE_A2A_AI_COACH", true)?,
            enable_a2a_escalation: env_bool("SUPERVISOR_ENABLE_A2A_ESCALATION", true)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn registry_defaults_require_jwt_secret_when_auth_enabled() {
        let _g = ENV_LOCK.lock().unwrap();
        env::remove_var("REGISTRY_JWT_SECRET");
        env::remove_var("REGISTRY_AUTH_ENABLED");
        let err = RegistryConfig::from_env().unwrap_err();
        assert!(matches!(err, SectionError::Missing("REGISTRY_JWT_SECRET")));
    }

    #[test]
    fn registry_auth_disabled_skips_jwt_requirement() {
        let _g = ENV_LOCK.lock().unwrap();
        env::remove_var("REGISTRY_JWT_SECRET");
        env::set_var("REGISTRY_AUTH_ENABLED", "false");
        let cfg = RegistryConfig::from_env().unwrap();
        assert!(!cfg.auth_enabled);
        assert_eq!(cfg.jwt_algorithm, "HS256");
        env::remove_var("REGISTRY_AUTH_ENABLED");
    }

    #[test]
    fn a2a_defaults_match_spec() {
        let _g = ENV_LOCK.lock().unwrap();
        for k in [
            "A2A_TIMEOUT_SECONDS",
            "A2A_MAX_RETRIES",
            "A2A_RETRY_BACKOFF_SECONDS",
            "A2A_CIRCUIT_BREAKER_THRESHOLD",
            "A2A_CIRCUIT_BREAKER_TIMEOUT_SECONDS",
        ] {
            env::remove_var(k);
        }
        let cfg = A2aConfig::from_env().unwrap();
        assert_eq!(cfg.timeout_seconds, 30);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.retry_backoff_seconds, 2);
        assert_eq!(cfg.circuit_breaker_threshold, 5);
        assert_eq!(cfg.circuit_breaker_timeout_seconds, 60);
    }

    #[test]
    fn cache_defaults_match_spec() {
        let _g = ENV_LOCK.lock().unwrap();
        env::remove_var("CACHE_TTL_SECONDS");
        env::remove_var("CACHE_CLEANUP_AGE_SECONDS");
        let cfg = CacheConfig::from_env().unwrap();
        assert_eq!(cfg.ttl_seconds, 300);
        assert_eq!(cfg.cleanup_age_seconds, 3600);
    }
}
