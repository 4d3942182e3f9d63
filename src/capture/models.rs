use chrono::{DateTime, Utc};

/// One captured image of an unrecognized visitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureModel {
    pub room_id: String,
    pub image_path: String, // Path on the recognition worker's storage
    pub captured_at: DateTime<Utc>,
}

impl CaptureModel {
    /// Creates a capture stamped with the current time
    pub fn new(room_id: String, image_path: String) -> Self {
        Self {
            room_id,
            image_path,
            captured_at: Utc::now(),
        }
    }
}
