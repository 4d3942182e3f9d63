use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::endpoint::{ChannelEndpoint, ConnectionId, EndpointHandle};
use super::messages::{parse_identification, EndpointSlot, Identification, COMMAND_BUFFER_SIZE};
use super::socket::{Connection, SessionEnd};
use crate::room::RoomRegistry;
use crate::shared::{HubError, HubState};

/// Drive one accepted connection from identification to teardown.
///
/// A connection whose first buffer is not a valid identification line is closed
/// without touching the registry.
pub async fn handle_connection<S>(
    stream: S,
    state: HubState,
    shutdown: CancellationToken,
) -> Result<(), HubError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let connection_id = ConnectionId::new();
    let (mut reader, writer) = tokio::io::split(stream);

    let mut buffer = [0u8; COMMAND_BUFFER_SIZE];
    let received = tokio::select! {
        _ = shutdown.cancelled() => return Ok(()),
        read = reader.read(&mut buffer) => read?,
    };
    if received == 0 {
        debug!(connection_id = %connection_id, "Connection closed before identifying");
        return Ok(());
    }

    let line = String::from_utf8_lossy(&buffer[..received]);
    let identification = match parse_identification(&line) {
        Ok(identification) => identification,
        Err(e) => {
            warn!(
                connection_id = %connection_id,
                error = %e,
                "Rejecting unidentified connection"
            );
            return Err(e.into());
        }
    };
    let Identification { role, room_id } = identification;

    // Create the outbound channel (hub -> client)
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel();
    let evicted = CancellationToken::new();
    let endpoint: EndpointHandle = Arc::new(ChannelEndpoint::new(
        connection_id,
        outbound_sender,
        evicted.clone(),
    ));

    state.room_registry.get_or_create(&room_id).await;
    match role.endpoint_slot() {
        Some(EndpointSlot::Device) => {
            state
                .room_registry
                .set_device_endpoint(&room_id, endpoint)
                .await;
        }
        Some(EndpointSlot::Worker) => {
            state
                .room_registry
                .set_worker_endpoint(&room_id, endpoint)
                .await;
        }
        None => {}
    }

    info!(
        connection_id = %connection_id,
        role = %role,
        room_id = %room_id,
        "Client connected"
    );

    let connection = Connection::new(
        connection_id,
        role,
        room_id.clone(),
        reader,
        writer,
        outbound_receiver,
        state.message_handler.clone(),
        evicted,
        shutdown,
    );

    let end = connection.run().await;

    match &end {
        SessionEnd::Evicted => {
            info!(
                connection_id = %connection_id,
                role = %role,
                room_id = %room_id,
                "Connection replaced by a newer registration"
            );
            // The slot belongs to the replacement now; leave the room alone
            return Ok(());
        }
        SessionEnd::ReadFailed(e) => {
            warn!(connection_id = %connection_id, error = %e, "Read failed, disconnecting");
        }
        _ => {}
    }

    unregister(
        state.room_registry.as_ref(),
        connection_id,
        role.endpoint_slot(),
        &room_id,
    )
    .await;

    info!(
        connection_id = %connection_id,
        role = %role,
        room_id = %room_id,
        reason = ?end,
        "Client disconnected"
    );

    Ok(())
}

/// Clear our own slot, then drop the whole room entry.
///
/// The room goes away on any disconnect, even while the other role is still
/// connected; peers rely on its absence to report that nobody is there.
async fn unregister(
    rooms: &dyn RoomRegistry,
    connection_id: ConnectionId,
    slot: Option<EndpointSlot>,
    room_id: &str,
) {
    match slot {
        Some(EndpointSlot::Device) => {
            rooms.clear_device_endpoint(room_id, connection_id).await;
        }
        Some(EndpointSlot::Worker) => {
            rooms.clear_worker_endpoint(room_id, connection_id).await;
        }
        None => {}
    }

    rooms.remove(room_id).await;
}
