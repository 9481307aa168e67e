//! Fulfillment server - request, bid and project broker with webhook notifications

use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fulfillment::config::Config;
use fulfillment::{router, store, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fulfillment=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    // Database connection and migrations
    let pool = store::connect(&config.database_url, config.database_max_connections).await?;

    let state = AppState::new(pool, config.dispatcher_config())?;

    // Periodic retry sweep, when not driven externally
    let sweeper = config.retry_interval().map(|period| {
        tracing::info!(period_secs = period.as_secs(), "Starting webhook sweeper");
        state.dispatcher.spawn_sweeper(period)
    });

    // Build router
    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }

    Ok(())
}
