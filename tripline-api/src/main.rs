use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tripline_api::{app, AppState};
use tripline_booking::{BookingService, LastBookingService};
use tripline_core::context::ContextStore;
use tripline_provider::{HttpSearchProvider, ProviderConfig, SearchOrchestrator};
use tripline_store::{
    DbClient, MemoryContextStore, PgBookingRepository, RedisContextStore,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripline_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = tripline_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Tripline API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");
    let repository = Arc::new(PgBookingRepository::new(db.pool.clone()));

    // Session context: Redis when configured, in-process otherwise.
    let context: Arc<dyn ContextStore> = match config.context.redis_url.as_deref() {
        Some(url) if !url.is_empty() => {
            let store = RedisContextStore::new(url, config.context.ttl_seconds)
                .expect("Failed to connect to Redis");
            Arc::new(store)
        }
        _ => Arc::new(MemoryContextStore::new(Some(Duration::from_secs(
            config.context.ttl_seconds,
        )))),
    };

    // Upstream search provider
    let provider = HttpSearchProvider::new(ProviderConfig {
        base_url: config.provider.base_url.clone(),
        api_key: config.provider.api_key.clone(),
        timeout: Duration::from_secs(config.provider.timeout_seconds),
        max_retries: config.provider.max_retries,
        retry_base_delay: Duration::from_millis(config.provider.retry_base_ms),
    })
    .expect("Failed to build provider client");

    let orchestrator = Arc::new(SearchOrchestrator::new(
        Arc::new(provider),
        context.clone(),
        config.fares.clone(),
    ));
    let booking = Arc::new(BookingService::new(context.clone(), repository.clone()));
    let retrieval = Arc::new(LastBookingService::new(repository));

    let app_state = AppState { orchestrator, booking, retrieval };
    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
