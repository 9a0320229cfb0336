//! RiskWatch Backend Server
//!
//! Ingests intrusion-detection alerts, scores and deduplicates them,
//! enriches novel alerts through an external scoring oracle, and
//! pushes live updates to dashboard clients.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        RISKWATCH                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  API      │  │  Enrichment  │  │  Broadcast Hub        │ │
//! │  │  (Axum)   │  │  Worker Pool │  │  (SSE fan-out)        │ │
//! │  └─────┬─────┘  └──────┬───────┘  └───────────┬───────────┘ │
//! │        └───────────────┼──────────────────────┘              │
//! │                        ▼                                     │
//! │                 ┌─────────────┐      ┌────────────────┐     │
//! │                 │ PostgreSQL  │      │ Scoring Oracle │     │
//! │                 └─────────────┘      └────────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod aggregate;
mod config;
mod db;
mod enrichment;
mod error;
mod events;
mod handlers;
mod models;
mod scoring;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::net::SocketAddr;

use enrichment::{EnrichmentQueue, ScoringOracle};
use events::EventBroadcaster;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "riskwatch_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("RiskWatch server starting...");
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    // Live update hub and enrichment pool
    let events = EventBroadcaster::new(100);
    let oracle = ScoringOracle::new(&config.oracle_url, config.oracle_timeout_secs);
    let enrichment = EnrichmentQueue::start(&config, pool.clone(), oracle, events.clone());

    // Build application state
    let state = AppState {
        pool,
        config: config.clone(),
        events,
        enrichment,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: config::Config,
    pub events: EventBroadcaster,
    pub enrichment: EnrichmentQueue,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))

        // Ingestion pipeline
        .route("/ingest", post(handlers::alerts::ingest))
        .route("/alerts/recent", get(handlers::alerts::recent))

        // Aggregations
        .route("/risks/leaderboard", get(handlers::stats::leaderboard))
        .route("/stats/kpi", get(handlers::stats::kpi))

        // Analyst feedback
        .route("/feedback", post(handlers::feedback::submit))

        // Live updates
        .route("/events", get(handlers::events::stream))

        // Lab tooling
        .route("/simulate/:attack_name", post(handlers::simulate::run))

        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
