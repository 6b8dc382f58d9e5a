use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use discount_api::{
    auth::TokenService,
    clock::{Clock, SystemClock},
    config::AppConfig,
    create_router, db,
    settings::SettingsStore,
    store::{PgStore, Store},
    sweeper::{run_periodic, OfferExpirySweeper, ReservationSweeper, Sweep},
    AppState,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Discount API - Starting...");

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let policy = Arc::new(SettingsStore::with_ttl(pool, config.policy_cache_ttl));
    let tokens = Arc::new(TokenService::new(&config.jwt_secret));

    // Background sweepers stop when the shutdown flag flips
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reservation_sweeper: Arc<dyn Sweep> =
        Arc::new(ReservationSweeper::new(store.clone(), clock.clone()));
    let offer_sweeper: Arc<dyn Sweep> = Arc::new(OfferExpirySweeper::new(store.clone(), clock.clone()));
    let workers = vec![
        tokio::spawn(run_periodic(
            reservation_sweeper,
            config.reservation_sweep_interval,
            shutdown_rx.clone(),
        )),
        tokio::spawn(run_periodic(
            offer_sweeper,
            config.offer_sweep_interval,
            shutdown_rx,
        )),
    ];

    // Create the application router
    let app = create_router(AppState::new(store, policy, clock, tokens));

    // Start the Axum server
    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Discount API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
        })
        .await
        .expect("Server error");

    let _ = shutdown_tx.send(true);
    for worker in workers {
        if let Err(e) = worker.await {
            tracing::error!("Sweeper task failed: {}", e);
        }
    }

    tracing::info!("Discount API stopped");
}
