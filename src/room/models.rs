use std::fmt;

use crate::connection::{ConnectionId, Endpoint, EndpointHandle, EndpointSlot};

/// Routing entry for one room: at most one live device and one live worker
#[derive(Clone)]
pub struct Room {
    pub id: String,                      // Room number, e.g. "204"
    pub device: Option<EndpointHandle>,  // Door-lock controller
    pub worker: Option<EndpointHandle>,  // Face-recognition worker
}

impl Room {
    /// Creates a room with no live endpoints
    pub fn new(id: String) -> Self {
        Self {
            id,
            device: None,
            worker: None,
        }
    }

    pub fn endpoint(&self, slot: EndpointSlot) -> Option<&EndpointHandle> {
        match slot {
            EndpointSlot::Device => self.device.as_ref(),
            EndpointSlot::Worker => self.worker.as_ref(),
        }
    }

    /// Install `endpoint` in `slot`, returning the previous occupant
    pub fn install(
        &mut self,
        slot: EndpointSlot,
        endpoint: EndpointHandle,
    ) -> Option<EndpointHandle> {
        self.slot_mut(slot).replace(endpoint)
    }

    /// Empty `slot` if it still holds `connection_id`; returns whether it did
    pub fn clear(&mut self, slot: EndpointSlot, connection_id: ConnectionId) -> bool {
        let occupant = self.slot_mut(slot);
        if occupant
            .as_ref()
            .is_some_and(|endpoint| endpoint.connection_id() == connection_id)
        {
            *occupant = None;
            return true;
        }
        false
    }

    fn slot_mut(&mut self, slot: EndpointSlot) -> &mut Option<EndpointHandle> {
        match slot {
            EndpointSlot::Device => &mut self.device,
            EndpointSlot::Worker => &mut self.worker,
        }
    }
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("device", &self.device.as_ref().map(|e| e.connection_id()))
            .field("worker", &self.worker.as_ref().map(|e| e.connection_id()))
            .finish()
    }
}
