// Library crate for the door hub relay
// This file exposes the public API for the binary and integration tests

pub mod capture;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod room;
pub mod server;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use capture::{CaptureRepository, InMemoryCaptureRepository, MySqlCaptureRepository};
pub use config::HubConfig;
pub use connection::{handle_connection, ClientRole, MessageHandler};
pub use dispatch::{CaptureGate, HubMessageHandler};
pub use room::{InMemoryRoomRegistry, Room, RoomRegistry};
pub use server::Server;
pub use shared::{HubError, HubState};
