mod auth;
mod routes;

use auth::JwtAuth;
use jsonwebtoken::Algorithm;
use registry::{FileDurableStore, HotIndex, InMemoryHotIndex, RegistryService};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub struct AppState {
    pub registry: Arc<RegistryService>,
    pub jwt: JwtAuth,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    config::load_and_apply("banking-fabric", None)?;
    let registry_config = config::RegistryConfig::from_env()?;

    let hot: Arc<dyn HotIndex> = Arc::new(InMemoryHotIndex::new(Duration::from_secs(
        registry_config.redis_ttl_seconds,
    )));
    let durable_dir = registry_config
        .durable_endpoint
        .clone()
        .unwrap_or_else(|| "/tmp/banking-fabric/registry".to_string());
    let durable = Arc::new(FileDurableStore::new(durable_dir));
    let registry_service = Arc::new(RegistryService::new(hot, Some(durable)));

    if registry_config.health_check_enabled {
        let http = reqwest::Client::new();
        let health_config = registry::HealthMonitorConfig {
            check_interval_seconds: registry_config.health_check_interval_seconds,
            stale_agent_threshold_minutes: registry_config.stale_agent_threshold_minutes as i64,
            probe_timeout: Duration::from_secs(5),
        };
        registry::spawn_health_monitor(registry_service.clone(), http, health_config);
    }

    let jwt = JwtAuth {
        enabled: registry_config.auth_enabled,
        secret: registry_config.jwt_secret.clone().unwrap_or_default(),
        algorithm: Algorithm::from_str(&registry_config.jwt_algorithm).unwrap_or(Algorithm::HS256),
        expiration_seconds: registry_config.jwt_expiration_seconds as i64,
    };

    let state = Arc::new(AppState {
        registry: registry_service,
        jwt,
    });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8100").await?;
    tracing::info!("registry-server listening on 0.0.0.0:8100");
    axum::serve(listener, app).await?;
    Ok(())
}
