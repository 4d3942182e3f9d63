// Public API
pub use endpoint::{ChannelEndpoint, ConnectionId, Endpoint, EndpointHandle, PendingWrite};
pub use handler::handle_connection;
pub use messages::{
    decode_command, parse_identification, parse_worker_report, ClientRole, EndpointSlot,
    HubCommand, Identification, ProtocolError, RecognitionStatus, WorkerReport,
    COMMAND_BUFFER_SIZE, MAX_ROOM_ID_LEN, OPEN_MARKER, WRONG_PASSWORD_MARKER,
};
pub use socket::{Connection, MessageHandler, SessionEnd};

// Internal modules
mod endpoint;
mod handler;
mod messages;
mod socket;
