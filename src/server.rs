use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::HubConfig;
use crate::connection::handle_connection;
use crate::shared::{HubError, HubState};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP acceptor handing each connection to its own session task
pub struct Server {
    listener: TcpListener,
    state: HubState,
    shutdown_timeout: Duration,
}

impl Server {
    /// Bind the listener; failure here is fatal for the process
    pub async fn bind(config: &HubConfig, state: HubState) -> Result<Self, HubError> {
        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            error!(addr = %addr, error = %e, "Failed to bind listener");
            HubError::Io(e)
        })?;

        Ok(Self {
            listener,
            state,
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, HubError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` is cancelled, then wait for sessions
    /// to finish their teardown
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), HubError> {
        let tracker = TaskTracker::new();
        info!(addr = %self.local_addr()?, "Waiting for clients");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let state = self.state.clone();
                        let shutdown = shutdown.clone();
                        tracker.spawn(
                            async move {
                                if let Err(e) = handle_connection(stream, state, shutdown).await {
                                    warn!(error = %e, "Session ended with error");
                                }
                            }
                            .instrument(info_span!("session", peer = %peer)),
                        );
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        if !back_off_after_accept_error(&shutdown).await {
                            break;
                        }
                    }
                },
            }
        }

        info!(sessions = tracker.len(), "Shutting down, waiting for sessions");
        tracker.close();
        if tokio::time::timeout(self.shutdown_timeout, tracker.wait())
            .await
            .is_err()
        {
            warn!(
                timeout_secs = self.shutdown_timeout.as_secs(),
                "Shutdown timed out, some sessions may still be running"
            );
        }

        Ok(())
    }
}

/// Errors such as EMFILE persist until sessions close, so pause before the next
/// accept. Returns false when shutdown arrives during the pause.
async fn back_off_after_accept_error(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
    }
}
