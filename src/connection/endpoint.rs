use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::shared::HubError;

/// Identity of one accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-owning route to a live session.
///
/// The registry stores these so the dispatcher can reach a peer without ever
/// touching the peer's socket directly. Only the owning session reads or writes it.
#[async_trait]
pub trait Endpoint: Send + Sync {
    fn connection_id(&self) -> ConnectionId;

    /// Write one command to the peer, resolving once the bytes reached its socket
    async fn send_command(&self, command: &str) -> Result<(), HubError>;

    /// Ask the owning session to close its connection
    fn close(&self);
}

pub type EndpointHandle = Arc<dyn Endpoint>;

/// A command queued for a session's writer, acknowledged once written
pub struct PendingWrite {
    pub text: String,
    pub delivered: oneshot::Sender<Result<(), HubError>>,
}

/// Endpoint backed by the session's outbound channel
pub struct ChannelEndpoint {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<PendingWrite>,
    evicted: CancellationToken,
}

impl ChannelEndpoint {
    pub fn new(
        id: ConnectionId,
        outbound: mpsc::UnboundedSender<PendingWrite>,
        evicted: CancellationToken,
    ) -> Self {
        Self {
            id,
            outbound,
            evicted,
        }
    }
}

#[async_trait]
impl Endpoint for ChannelEndpoint {
    fn connection_id(&self) -> ConnectionId {
        self.id
    }

    async fn send_command(&self, command: &str) -> Result<(), HubError> {
        let (delivered, acknowledgement) = oneshot::channel();
        self.outbound
            .send(PendingWrite {
                text: command.to_string(),
                delivered,
            })
            .map_err(|_| HubError::PeerGone(self.id.to_string()))?;

        acknowledgement
            .await
            .map_err(|_| HubError::PeerGone(self.id.to_string()))?
    }

    fn close(&self) {
        self.evicted.cancel();
    }
}
