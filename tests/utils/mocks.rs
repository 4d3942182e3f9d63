use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use door_hub::{CaptureRepository, HubError};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Capture store whose database is always unreachable
#[derive(Default)]
pub struct FailingCaptureRepository {
    attempts: AtomicUsize,
}

impl FailingCaptureRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureRepository for FailingCaptureRepository {
    async fn record_capture(&self, _room_id: &str, _image_path: &str) -> Result<(), HubError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(HubError::Database("Can't connect to MySQL server".to_string()))
    }
}
