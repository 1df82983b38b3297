mod config;

use std::error::Error;
use std::net::SocketAddr;

use actors::Engine;
use clap::Parser;
use db::repositories::ConfigRepository;
use jobs_core::JobEvent;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::parse();

    db::init(config.db_config()).await?;

    if let Some(ms) = config.polling_interval_ms {
        let interval = ConfigRepository::set_polling_interval(ms).await?;
        tracing::info!("Polling interval set to {:?}", interval);
    }

    let engine = Engine::surreal()
        .with_config(config.engine_config())
        .start()
        .await?;
    tokio::spawn(log_events(engine.subscribe()));

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    let app = gateway::router_with_rate_limit(config.rate_limit);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    engine.stop().await?;

    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<JobEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::debug!(target: "jobs::events", "{}", event.description()),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!("Event log fell behind, {} events dropped", missed)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
    tracing::info!("Shutting down");
}
