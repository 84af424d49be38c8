use anyhow::Context;
use tokio::net::TcpListener;

use changi_backend::config::Config;
use changi_backend::server::router::router;
use changi_backend::{core, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;
    core::logging::init(&config.log_dir);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    let state = AppState::initialize(config)
        .await
        .map_err(|err| anyhow::anyhow!("Failed to initialize services: {}", err))?;

    tracing::info!("Listening on {}", listener.local_addr()?);

    let app = router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
