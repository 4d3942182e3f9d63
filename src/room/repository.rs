use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::models::Room;
use crate::connection::{ConnectionId, Endpoint, EndpointHandle, EndpointSlot};

/// Process-wide mapping from room identifier to its live endpoints
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    /// Snapshot of the room entry, if any
    async fn find(&self, room_id: &str) -> Option<Room>;

    /// Atomically returns the existing entry or inserts an empty one
    async fn get_or_create(&self, room_id: &str) -> Room;

    /// Removes the entry. Never closes any connection
    async fn remove(&self, room_id: &str);

    /// Installs the device endpoint, closing any device connection it displaces.
    /// Returns the displaced connection
    async fn set_device_endpoint(
        &self,
        room_id: &str,
        endpoint: EndpointHandle,
    ) -> Option<ConnectionId>;

    /// Installs the worker endpoint, closing any worker connection it displaces.
    /// Returns the displaced connection
    async fn set_worker_endpoint(
        &self,
        room_id: &str,
        endpoint: EndpointHandle,
    ) -> Option<ConnectionId>;

    /// Empties the device slot if it still holds `connection_id`. Never closes it
    async fn clear_device_endpoint(&self, room_id: &str, connection_id: ConnectionId) -> bool;

    /// Empties the worker slot if it still holds `connection_id`. Never closes it
    async fn clear_worker_endpoint(&self, room_id: &str, connection_id: ConnectionId) -> bool;
}

/// In-memory registry guarded by a single lock over the whole mapping
pub struct InMemoryRoomRegistry {
    rooms: Mutex<HashMap<String, Room>>,
}

impl Default for InMemoryRoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the current number of room entries
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    async fn install(
        &self,
        room_id: &str,
        slot: EndpointSlot,
        endpoint: EndpointHandle,
    ) -> Option<ConnectionId> {
        let connection_id = endpoint.connection_id();
        let mut rooms = self.rooms.lock().await;

        // A teardown may have removed the room since the caller created it
        let room = rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::new(room_id.to_string()));

        let displaced = room.install(slot, endpoint).map(|previous| {
            // Closed under the lock so two registrations cannot both close it
            previous.close();
            previous.connection_id()
        });

        match displaced {
            Some(previous_id) => info!(
                room_id = %room_id,
                slot = %slot,
                previous_connection = %previous_id,
                connection_id = %connection_id,
                "Replaced live endpoint, closing previous connection"
            ),
            None => debug!(
                room_id = %room_id,
                slot = %slot,
                connection_id = %connection_id,
                "Endpoint installed"
            ),
        }

        displaced
    }

    async fn clear(&self, room_id: &str, slot: EndpointSlot, connection_id: ConnectionId) -> bool {
        let mut rooms = self.rooms.lock().await;
        let cleared = rooms
            .get_mut(room_id)
            .is_some_and(|room| room.clear(slot, connection_id));

        debug!(
            room_id = %room_id,
            slot = %slot,
            connection_id = %connection_id,
            cleared = cleared,
            "Endpoint cleared"
        );
        cleared
    }
}

#[async_trait]
impl RoomRegistry for InMemoryRoomRegistry {
    #[instrument(skip(self))]
    async fn find(&self, room_id: &str) -> Option<Room> {
        let rooms = self.rooms.lock().await;
        let room = rooms.get(room_id).cloned();

        if room.is_none() {
            debug!(room_id = %room_id, "Room not found");
        }
        room
    }

    #[instrument(skip(self))]
    async fn get_or_create(&self, room_id: &str) -> Room {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                debug!(room_id = %room_id, "Creating room");
                Room::new(room_id.to_string())
            })
            .clone()
    }

    #[instrument(skip(self))]
    async fn remove(&self, room_id: &str) {
        let mut rooms = self.rooms.lock().await;
        if rooms.remove(room_id).is_some() {
            debug!(room_id = %room_id, "Room removed");
        }
    }

    #[instrument(skip(self, endpoint))]
    async fn set_device_endpoint(
        &self,
        room_id: &str,
        endpoint: EndpointHandle,
    ) -> Option<ConnectionId> {
        self.install(room_id, EndpointSlot::Device, endpoint).await
    }

    #[instrument(skip(self, endpoint))]
    async fn set_worker_endpoint(
        &self,
        room_id: &str,
        endpoint: EndpointHandle,
    ) -> Option<ConnectionId> {
        self.install(room_id, EndpointSlot::Worker, endpoint).await
    }

    #[instrument(skip(self))]
    async fn clear_device_endpoint(&self, room_id: &str, connection_id: ConnectionId) -> bool {
        self.clear(room_id, EndpointSlot::Device, connection_id).await
    }

    #[instrument(skip(self))]
    async fn clear_worker_endpoint(&self, room_id: &str, connection_id: ConnectionId) -> bool {
        self.clear(room_id, EndpointSlot::Worker, connection_id).await
    }
}
