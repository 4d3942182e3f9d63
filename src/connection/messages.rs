use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use thiserror::Error;

/// Size of the read buffer for the identification line and every command
pub const COMMAND_BUFFER_SIZE: usize = 256;

/// Room identifiers are stored in a fixed ten byte field on the devices, nine usable
pub const MAX_ROOM_ID_LEN: usize = 9;

pub const WRONG_PASSWORD_MARKER: &str = "wrong_password";
pub const OPEN_MARKER: &str = "open";

const WORKER_COMMAND_PREFIX: &str = "FR:room_";

/// Role a client declares in its identification line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum ClientRole {
    #[strum(serialize = "device")]
    Device,
    #[strum(serialize = "recognition_worker")]
    RecognitionWorker,
    #[strum(serialize = "web_controller")]
    WebController,
}

/// The per-room slot a role occupies in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EndpointSlot {
    #[strum(serialize = "device")]
    Device,
    #[strum(serialize = "worker")]
    Worker,
}

impl ClientRole {
    pub fn identification_prefix(&self) -> &'static str {
        match self {
            ClientRole::Device => "ESP32:room_",
            ClientRole::RecognitionWorker => "FR:room_",
            ClientRole::WebController => "WEB:room_",
        }
    }

    /// Web controllers never receive routed writes, so they hold no slot
    pub fn endpoint_slot(&self) -> Option<EndpointSlot> {
        match self {
            ClientRole::Device => Some(EndpointSlot::Device),
            ClientRole::RecognitionWorker => Some(EndpointSlot::Worker),
            ClientRole::WebController => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unrecognized identification line {0:?}")]
    UnknownIdentification(String),

    #[error("identification line carries no room identifier")]
    MissingRoomId,

    #[error("room identifier {0:?} is longer than nine bytes")]
    RoomIdTooLong(String),

    #[error("not a recognition worker report")]
    NotWorkerReport,

    #[error("unknown recognition status {0:?}")]
    UnknownStatus(String),

    #[error("capture report carries no image path")]
    MissingImagePath,
}

/// Result of a successful identification handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub role: ClientRole,
    pub room_id: String,
}

/// Parses the first buffer read from a new connection.
///
/// The room identifier is the whitespace-delimited token following the role prefix.
pub fn parse_identification(line: &str) -> Result<Identification, ProtocolError> {
    let (role, rest) = ClientRole::iter()
        .find_map(|role| {
            line.strip_prefix(role.identification_prefix())
                .map(|rest| (role, rest))
        })
        .ok_or_else(|| ProtocolError::UnknownIdentification(line.to_string()))?;

    let room_id = rest
        .split(|c: char| c.is_whitespace() || c == '\0')
        .find(|token| !token.is_empty())
        .ok_or(ProtocolError::MissingRoomId)?;

    if room_id.len() > MAX_ROOM_ID_LEN {
        return Err(ProtocolError::RoomIdTooLong(room_id.to_string()));
    }

    Ok(Identification {
        role,
        room_id: room_id.to_string(),
    })
}

/// Turns one raw read into command text, dropping trailing padding and line endings
pub fn decode_command(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// Recognition outcome carried by a worker report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionStatus<'a> {
    Failure,
    Success,
    Capture { image_path: &'a str },
}

/// `FR:room_<id>:<status>:<path>` as sent by a recognition worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport<'a> {
    /// Room identifier embedded in the report; routing never trusts it
    pub room_id: &'a str,
    pub status: RecognitionStatus<'a>,
}

pub fn parse_worker_report(command: &str) -> Result<WorkerReport<'_>, ProtocolError> {
    let rest = command
        .strip_prefix(WORKER_COMMAND_PREFIX)
        .ok_or(ProtocolError::NotWorkerReport)?;

    let mut fields = rest.splitn(3, ':');
    let room_id = fields
        .next()
        .filter(|field| !field.is_empty())
        .ok_or(ProtocolError::NotWorkerReport)?;
    let status = fields
        .next()
        .filter(|field| !field.is_empty())
        .ok_or(ProtocolError::NotWorkerReport)?;
    let tail = fields.next().unwrap_or_default();

    let status = match status {
        "failure" => RecognitionStatus::Failure,
        "success" => RecognitionStatus::Success,
        "capture" => {
            let image_path = tail
                .split_whitespace()
                .next()
                .ok_or(ProtocolError::MissingImagePath)?;
            RecognitionStatus::Capture { image_path }
        }
        other => return Err(ProtocolError::UnknownStatus(other.to_string())),
    };

    Ok(WorkerReport { room_id, status })
}

/// Commands the hub writes to devices and workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HubCommand {
    #[strum(serialize = "request_capture")]
    RequestCapture,
    #[strum(serialize = "failure")]
    RecognitionFailed,
    #[strum(serialize = "activate_keypad")]
    ActivateKeypad,
    #[strum(serialize = "open")]
    OpenDoor,
}

impl HubCommand {
    pub fn to_wire(&self, room_id: &str) -> String {
        match self {
            HubCommand::RequestCapture => format!("FR:room_{}:{}", room_id, self),
            _ => format!("ROOM_{}:{}", room_id, self),
        }
    }
}
