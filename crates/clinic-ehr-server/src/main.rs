use anyhow::Context;
use clinic_ehr_server::{build_router, telemetry, AppState, ServerConfig};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("failed to load configuration")?;
    telemetry::init(&config.log_level, config.log_json);

    if !config.google.is_configured() {
        warn!("Google OAuth client not configured; calendar sync is disabled");
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config).context("failed to open clinic database")?;
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Clinic EHR listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
}
