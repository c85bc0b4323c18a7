// src/main.rs
use std::net::SocketAddr;

use poll_app::{config::Config, routes, state::AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok(); // Load environment variables from .env file

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::load()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = AppState::connect(config).await?;
    let app = routes::create_routes(state);

    info!(%addr, "poll service listening");
    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
