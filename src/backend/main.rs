/**
 * clawswarm Server Entry Point
 *
 * Loads `.env`, initializes tracing, reads the configuration and serves the
 * Axum app until the process is stopped.
 */

use clawswarm::backend::server::create_app;
use clawswarm::shared::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!("[Startup] Server initialization started");

    let config = AppConfig::from_env()?;
    let port = config.server_port;

    let app = create_app(config).await?;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("[Startup] Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
