use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::capture_gate::CaptureGate;
use crate::capture::CaptureRepository;
use crate::connection::{
    parse_worker_report, ClientRole, Endpoint, EndpointHandle, HubCommand, MessageHandler,
    RecognitionStatus, OPEN_MARKER, WRONG_PASSWORD_MARKER,
};
use crate::room::{Room, RoomRegistry};
use crate::shared::HubError;

/// Routes commands between the device, worker and web sessions of a room
pub struct HubMessageHandler {
    room_registry: Arc<dyn RoomRegistry>,
    capture_repository: Arc<dyn CaptureRepository>,
    capture_gate: CaptureGate,
    write_timeout: Duration,
}

impl HubMessageHandler {
    pub fn new(
        room_registry: Arc<dyn RoomRegistry>,
        capture_repository: Arc<dyn CaptureRepository>,
        capture_gate: CaptureGate,
        write_timeout: Duration,
    ) -> Self {
        Self {
            room_registry,
            capture_repository,
            capture_gate,
            write_timeout,
        }
    }

    async fn on_device_command(&self, room: &Room, message: &str) {
        if !message.contains(WRONG_PASSWORD_MARKER) {
            debug!(room_id = %room.id, "Device command carries nothing to route");
            return;
        }

        info!(room_id = %room.id, "Wrong password entered on keypad");
        let Some(worker) = room.worker.as_ref() else {
            info!(room_id = %room.id, "No recognition worker connected, dropping capture request");
            return;
        };

        let result = self
            .capture_gate
            .pass(self.deliver(worker, &room.id, HubCommand::RequestCapture))
            .await;
        log_delivery(&room.id, HubCommand::RequestCapture, result);
    }

    async fn on_worker_report(&self, room: &Room, message: &str) {
        let report = match parse_worker_report(message) {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    room_id = %room.id,
                    error = %e,
                    command = %message,
                    "Unrecognized recognition worker report"
                );
                return;
            }
        };

        if report.room_id != room.id {
            warn!(
                room_id = %room.id,
                embedded_room_id = %report.room_id,
                "Worker report names another room, routing to the worker's own room"
            );
        }

        match report.status {
            RecognitionStatus::Failure => {
                info!(room_id = %room.id, "Face recognition failed");
                self.notify_device(room, HubCommand::RecognitionFailed).await;
            }
            RecognitionStatus::Success => {
                info!(room_id = %room.id, "Face recognition succeeded");
                self.notify_device(room, HubCommand::ActivateKeypad).await;
            }
            RecognitionStatus::Capture { image_path } => {
                self.record_capture(&room.id, image_path).await;
            }
        }
    }

    async fn on_web_command(&self, room: &Room, message: &str) {
        if !message.contains(OPEN_MARKER) {
            debug!(room_id = %room.id, "Web command carries nothing to route");
            return;
        }

        info!(room_id = %room.id, "Open requested from web");
        self.notify_device(room, HubCommand::OpenDoor).await;
    }

    async fn notify_device(&self, room: &Room, command: HubCommand) {
        let Some(device) = room.device.as_ref() else {
            info!(room_id = %room.id, command = %command, "No device connected, dropping command");
            return;
        };

        let result = self.deliver(device, &room.id, command).await;
        log_delivery(&room.id, command, result);
    }

    async fn record_capture(&self, room_id: &str, image_path: &str) {
        match self
            .capture_repository
            .record_capture(room_id, image_path)
            .await
        {
            Ok(()) => info!(room_id = %room_id, image_path = %image_path, "Capture recorded"),
            Err(e) => error!(
                room_id = %room_id,
                image_path = %image_path,
                error = %e,
                "Failed to record capture"
            ),
        }
    }

    /// Write one command to a peer, bounded by the write timeout
    async fn deliver(
        &self,
        endpoint: &EndpointHandle,
        room_id: &str,
        command: HubCommand,
    ) -> Result<(), HubError> {
        let text = command.to_wire(room_id);
        tokio::time::timeout(self.write_timeout, endpoint.send_command(&text))
            .await
            .map_err(|_| HubError::WriteTimeout(self.write_timeout))?
    }
}

fn log_delivery(room_id: &str, command: HubCommand, result: Result<(), HubError>) {
    match result {
        Ok(()) => debug!(room_id = %room_id, command = %command, "Command delivered"),
        Err(e) => warn!(
            room_id = %room_id,
            command = %command,
            error = %e,
            "Failed to deliver command"
        ),
    }
}

#[async_trait]
impl MessageHandler for HubMessageHandler {
    async fn handle_message(&self, role: ClientRole, room_id: &str, message: &str) {
        let Some(room) = self.room_registry.find(room_id).await else {
            info!(room_id = %room_id, role = %role, "Room not registered, dropping command");
            return;
        };

        match role {
            ClientRole::Device => self.on_device_command(&room, message).await,
            ClientRole::RecognitionWorker => self.on_worker_report(&room, message).await,
            ClientRole::WebController => self.on_web_command(&room, message).await,
        }
    }
}
