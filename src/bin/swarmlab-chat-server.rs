//! Swarm Lab chat server
//!
//! Serves `/api/chat-stream`, `/api/chat` and `/api/test`. Configured through
//! `SWARMLAB_*` and provider environment variables.

use swarmlab_chat::backend::build_backend;
use swarmlab_chat::config::ServerConfig;
use swarmlab_chat::producer::StreamProducer;
use swarmlab_chat::server::{AppState, build_router};
use swarmlab_chat::telemetry;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = telemetry::init_from_env()?;
    let config = ServerConfig::from_env()?;

    let backend = build_backend(config.backend, config.gemini.clone(), config.openai.clone())?;
    if let Err(e) = backend.ensure_configured() {
        // Keep serving: requests get an in-band error frame and /api/test reports it.
        tracing::warn!(error = %e, "backend is not configured");
    }
    let producer = StreamProducer::new(backend).with_options(config.producer_options());
    let state = AppState::new(producer, config.backend, config.environment.clone());

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        backend = config.backend.as_str(),
        environment = %config.environment,
        "swarmlab chat server listening"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
