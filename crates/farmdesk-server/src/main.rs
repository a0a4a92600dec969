//! Farmdesk Server — application entry point.

use std::sync::Arc;
use std::time::Duration;

use farmdesk_core::repository::SessionRepository;
use farmdesk_db::DbManager;
use farmdesk_db::repository::SurrealSessionRepository;
use farmdesk_mail::Mailer;
use farmdesk_server::{AppState, ServerConfig, build_router};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real deployments set the environment.
    let dotenv = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("farmdesk=info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "Failed to load .env file");
        }
    }

    let config = ServerConfig::from_env()?;
    info!(addr = %config.bind_addr, "Starting Farmdesk server");

    let db = DbManager::connect(&config.db).await?;
    let mailer = Mailer::new(config.mail.clone());

    spawn_session_sweeper(SurrealSessionRepository::new(db.client().clone()));

    let state = AppState::new(
        db.client().clone(),
        config.auth.clone(),
        mailer,
        config.secure_cookies,
    );
    let app = build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Farmdesk server stopped");
    Ok(())
}

/// Periodically delete expired sessions.
fn spawn_session_sweeper<S: SessionRepository + 'static>(sessions: S) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(3600));
        loop {
            tick.tick().await;
            match sessions.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Removed expired sessions"),
                Err(e) => warn!(error = %e, "Expired session cleanup failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
