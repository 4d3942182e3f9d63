use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::capture::CaptureRepository;
use crate::connection::{MessageHandler, ProtocolError};
use crate::dispatch::{CaptureGate, HubMessageHandler};
use crate::room::RoomRegistry;

/// Shared hub state handed to every connection session
#[derive(Clone)]
pub struct HubState {
    pub room_registry: Arc<dyn RoomRegistry>,
    pub message_handler: Arc<dyn MessageHandler>,
}

impl HubState {
    pub fn new(
        room_registry: Arc<dyn RoomRegistry>,
        capture_repository: Arc<dyn CaptureRepository>,
        write_timeout: Duration,
    ) -> Self {
        let message_handler = Arc::new(HubMessageHandler::new(
            room_registry.clone(),
            capture_repository,
            CaptureGate::new(),
            write_timeout,
        ));

        Self {
            room_registry,
            message_handler,
        }
    }
}

#[derive(Error, Debug)]
pub enum HubError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection {0} is gone")]
    PeerGone(String),

    #[error("Write timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("Identification failed: {0}")]
    Identification(#[from] ProtocolError),
}
