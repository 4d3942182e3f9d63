use clap::Parser;
use door_hub::{
    CaptureRepository, HubConfig, HubState, InMemoryCaptureRepository, InMemoryRoomRegistry,
    MySqlCaptureRepository, Server,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "door_hub=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = HubConfig::parse();
    info!(port = config.port, "Starting door hub");

    let capture_repository: Arc<dyn CaptureRepository> = match config.database_url.as_deref() {
        Some(url) => match MySqlCaptureRepository::connect_lazy(url) {
            Ok(repository) => Arc::new(repository),
            Err(e) => {
                error!(error = %e, "Failed to configure capture database");
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("DATABASE_URL not set, captures will only be kept in memory");
            Arc::new(InMemoryCaptureRepository::new())
        }
    };

    let state = HubState::new(
        Arc::new(InMemoryRoomRegistry::new()),
        capture_repository,
        config.write_timeout(),
    );

    let server = match Server::bind(&config, state).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Failed to start hub");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    if let Err(e) = server.run(shutdown).await {
        error!(error = %e, "Hub stopped with error");
        return ExitCode::FAILURE;
    }

    info!("Door hub stopped");
    ExitCode::SUCCESS
}

async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
    shutdown.cancel();
}
