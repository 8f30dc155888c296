mod config;

use config::Config;
use geoquiz::game::NominatimGeocoder;
use sqlx::sqlite::SqlitePoolOptions;
use std::error::Error;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    let addr = config.addr();

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!().run(&pool).await?;

    let geocoder = NominatimGeocoder::new(&config.geocoder_url, config.geocoder_timeout)?;
    let server = geoquiz::build_server(pool, Arc::new(geocoder), config.game_config()).await?;

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, geoquiz::app(server))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutting down");
}
