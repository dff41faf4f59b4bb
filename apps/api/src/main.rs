mod broker;
mod compliance;
mod config;
mod db;
mod errors;
mod jd;
mod model_client;
mod models;
mod orchestrator;
mod progress;
mod ranking;
mod resume;
mod routes;
mod scoring;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::broker::{Broker, RedisBroker};
use crate::config::Config;
use crate::db::create_pool;
use crate::model_client::{AnthropicModelClient, ModelClient, RetryPolicy};
use crate::orchestrator::{workers, CancellationRegistry};
use crate::progress::ProgressHub;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ranker-api v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis-backed broker
    let redis_client = redis::Client::open(config.redis_url.clone())?;
    let broker: Arc<dyn Broker> = Arc::new(RedisBroker::new(&redis_client).await?);
    info!("Redis broker initialized");

    // Initialize model client (chat completion + embeddings, with retry and circuit breaker)
    let retry = RetryPolicy {
        max_attempts: config.max_attempts,
        initial_wait: config.initial_wait(),
        max_wait: config.max_wait(),
    };
    let model_client: Arc<dyn ModelClient> = Arc::new(AnthropicModelClient::new(
        config.anthropic_api_key.clone(),
        config.embedding_endpoint.clone(),
        config.embedding_batch_size,
        retry,
        config.circuit_threshold,
        config.circuit_cooldown(),
    ));
    info!("Model client initialized (model: {})", model_client::MODEL);

    let store: Arc<dyn Store> = Arc::new(PgStore::new(db.clone()));
    let progress = Arc::new(ProgressHub::new());
    let cancellation = CancellationRegistry::new();

    // Build app state
    let state = AppState {
        db,
        store,
        broker,
        model_client,
        progress,
        cancellation,
        config: config.clone(),
    };

    // Spawn queue-driven worker pools (spec §4.3 per-queue concurrency)
    workers::spawn_jd_workers(state.clone(), config.jd_queue_concurrency);
    workers::spawn_resume_workers(state.clone(), config.resume_queue_concurrency);
    workers::spawn_rank_workers(state.clone(), config.rank_queue_concurrency);
    info!(
        jd = config.jd_queue_concurrency,
        resume = config.resume_queue_concurrency,
        rank = config.rank_queue_concurrency,
        "worker pools started"
    );

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
