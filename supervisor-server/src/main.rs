mod directory;
mod routes;
mod sse;

use a2a::{A2aClient, A2aClientConfig, AgentIdentifier};
use directory::StaticDirectory;
use std::sync::Arc;
use supervisor::{ConversationState, KeywordOnlyClassifier, SupervisorRouter};
use telemetry::{NdjsonFileSink, NullSink, SharedSink};
use user_cache::{UserCache, UserCacheConfig};

pub struct AppState {
    pub router: Arc<SupervisorRouter>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    config::load_and_apply("banking-fabric", None)?;
    let supervisor_config = config::SupervisorConfig::from_env()?;
    let a2a_config = config::A2aConfig::from_env()?;
    let cache_config = config::CacheConfig::from_env()?;

    let directory: Arc<dyn a2a::AgentDirectory> = Arc::new(StaticDirectory::new(supervisor_config));
    let a2a_client = Arc::new(A2aClient::new(
        AgentIdentifier {
            agent_id: "supervisor".to_string(),
            agent_name: "Supervisor".to_string(),
        },
        directory,
        A2aClientConfig {
            max_retries: a2a_config.max_retries,
            retry_backoff: std::time::Duration::from_secs(a2a_config.retry_backoff_seconds),
            breaker: a2a::CircuitBreakerConfig {
                failure_threshold: a2a_config.circuit_breaker_threshold,
                timeout: std::time::Duration::from_secs(a2a_config.circuit_breaker_timeout_seconds),
                half_open_max_calls: 1,
            },
        },
    ));

    let cache = Arc::new(UserCache::new(UserCacheConfig {
        dir: cache_config.cache_dir.clone().into(),
        ttl: cache_config.ttl(),
        cleanup_age: std::time::Duration::from_secs(cache_config.cleanup_age_seconds),
    }));

    let sink: SharedSink = match std::env::var("TELEMETRY_DIR") {
        Ok(dir) => Arc::new(NdjsonFileSink::new(dir)),
        Err(_) => Arc::new(NullSink),
    };

    let conversation = Arc::new(ConversationState::new());
    let classifier: Arc<dyn supervisor::Classifier> = Arc::new(KeywordOnlyClassifier);
    let router = Arc::new(SupervisorRouter::new(conversation, classifier, cache, a2a_client, sink));

    let state = Arc::new(AppState { router });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
    tracing::info!("supervisor-server listening on 0.0.0.0:8000");
    axum::serve(listener, app).await?;
    Ok(())
}
