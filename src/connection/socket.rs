use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::endpoint::{ConnectionId, PendingWrite};
use super::messages::{decode_command, ClientRole, COMMAND_BUFFER_SIZE};
use crate::shared::HubError;

/// Handler for commands read from a connection
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one command buffer received from a client of the given role
    async fn handle_message(&self, role: ClientRole, room_id: &str, message: &str);
}

/// Why a connection stopped running
#[derive(Debug)]
pub enum SessionEnd {
    /// The client closed its side
    PeerClosed,
    /// A newer registration for the same role replaced this connection
    Evicted,
    /// The hub is shutting down
    Shutdown,
    ReadFailed(std::io::Error),
    WriteFailed,
}

/// Connection represents one identified client session.
/// Inbound commands go to the message handler; outbound commands arrive on the
/// outbound receiver from whoever holds this session's endpoint handle.
pub struct Connection<S> {
    pub id: ConnectionId,
    pub role: ClientRole,
    pub room_id: String,
    reader: ReadHalf<S>,
    writer: WriteHalf<S>,
    outbound_receiver: mpsc::UnboundedReceiver<PendingWrite>,
    message_handler: Arc<dyn MessageHandler>,
    evicted: CancellationToken,
    shutdown: CancellationToken,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ConnectionId,
        role: ClientRole,
        room_id: String,
        reader: ReadHalf<S>,
        writer: WriteHalf<S>,
        outbound_receiver: mpsc::UnboundedReceiver<PendingWrite>,
        message_handler: Arc<dyn MessageHandler>,
        evicted: CancellationToken,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            role,
            room_id,
            reader,
            writer,
            outbound_receiver,
            message_handler,
            evicted,
            shutdown,
        }
    }

    /// Run the connection until the client leaves, it is evicted, or the hub shuts down.
    /// Both halves of the socket are closed by the time this returns.
    pub async fn run(self) -> SessionEnd {
        let Connection {
            id,
            role,
            room_id,
            mut reader,
            writer,
            outbound_receiver,
            message_handler,
            evicted,
            shutdown,
        } = self;

        // Writes run on their own task so a session busy dispatching never stalls
        // peers that are waiting on a write to it.
        let stop_writer = CancellationToken::new();
        let mut writer_task = tokio::spawn(write_outbound(
            id,
            writer,
            outbound_receiver,
            stop_writer.clone(),
        ));
        let mut writer_finished = false;

        let mut buffer = [0u8; COMMAND_BUFFER_SIZE];
        let end = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break SessionEnd::Shutdown,
                _ = evicted.cancelled() => break SessionEnd::Evicted,
                _ = &mut writer_task => {
                    writer_finished = true;
                    break SessionEnd::WriteFailed;
                }
                read = reader.read(&mut buffer) => match read {
                    Ok(0) => break SessionEnd::PeerClosed,
                    Ok(n) => {
                        let command = decode_command(&buffer[..n]);
                        debug!(
                            connection_id = %id,
                            role = %role,
                            room_id = %room_id,
                            command = %command,
                            "Received command"
                        );
                        message_handler
                            .handle_message(role, &room_id, &command)
                            .await;
                    }
                    Err(e) => break SessionEnd::ReadFailed(e),
                },
            }
        };

        stop_writer.cancel();
        if !writer_finished {
            if let Err(e) = writer_task.await {
                warn!(connection_id = %id, error = %e, "Writer task failed");
            }
        }

        end
    }
}

/// Drains the outbound channel onto the socket until stopped or a write fails
async fn write_outbound<S>(
    id: ConnectionId,
    mut writer: WriteHalf<S>,
    mut outbound_receiver: mpsc::UnboundedReceiver<PendingWrite>,
    stop: CancellationToken,
) where
    S: AsyncWrite + Send,
{
    loop {
        let pending = tokio::select! {
            _ = stop.cancelled() => break,
            pending = outbound_receiver.recv() => match pending {
                Some(pending) => pending,
                None => break,
            },
        };

        let PendingWrite {
            text,
            mut delivered,
        } = pending;

        // The sender timed out and reported this command as dropped
        if delivered.is_closed() {
            debug!(connection_id = %id, command = %text, "Skipping abandoned command");
            continue;
        }

        // A peer that stopped reading must not hold up the session's teardown
        let written = tokio::select! {
            _ = stop.cancelled() => break,
            _ = delivered.closed() => {
                // Part of the command may already be on the stream
                warn!(
                    connection_id = %id,
                    command = %text,
                    "Command abandoned mid-write, closing connection"
                );
                break;
            }
            written = write_command(&mut writer, &text) => written,
        };

        match written {
            Ok(()) => {
                let _ = delivered.send(Ok(()));
            }
            Err(e) => {
                warn!(connection_id = %id, error = %e, "Failed to write command");
                let _ = delivered.send(Err(e));
                break;
            }
        }
    }

    let _ = writer.shutdown().await;
}

async fn write_command<W>(writer: &mut W, text: &str) -> Result<(), HubError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
