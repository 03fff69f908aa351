use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use debts_rs::{
    config::Config,
    db::{init_pool, run_migrations},
    repos::{DebtStore, PgDebtStore},
    routes::{debts_router, AppState},
    services::scheduler::spawn_monthly_scheduler,
    DebtCalculationEngine, EngineConfig,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting debts service...");

    let config = Config::from_env()
        .expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}, member_concurrency={}, scheduler_interval={}s",
        config.host,
        config.port,
        config.member_concurrency,
        config.scheduler_interval.as_secs()
    );

    tracing::info!("Connecting to database...");
    let pool = init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running migrations...");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let store: Arc<dyn DebtStore> = Arc::new(PgDebtStore::new(pool));
    let engine = Arc::new(DebtCalculationEngine::new(
        store.clone(),
        EngineConfig {
            member_concurrency: config.member_concurrency,
        },
    ));

    if config.run_catchup_on_startup {
        let outcome = engine.check_and_run_catchup_calculation().await;
        tracing::info!("Startup catch-up check: {:?}", outcome);
    }

    spawn_monthly_scheduler(engine.clone(), config.scheduler_interval);

    let app = debts_router(AppState {
        engine: engine.clone(),
        store,
    })
    .layer(
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    );

    let host: std::net::IpAddr = config
        .host
        .parse()
        .expect("HOST must be a valid IP address");
    let addr = SocketAddr::from((host, config.port));
    tracing::info!("Debts service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
