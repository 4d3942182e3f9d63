use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::CaptureModel;
use crate::shared::HubError;

/// Trait for storing captured-image metadata
#[async_trait]
pub trait CaptureRepository: Send + Sync {
    /// Associate an image path with the room it was captured in
    async fn record_capture(&self, room_id: &str, image_path: &str) -> Result<(), HubError>;
}

/// In-memory implementation of CaptureRepository for development and testing
///
/// Captures are lost when the hub restarts.
#[derive(Debug, Default)]
pub struct InMemoryCaptureRepository {
    captures: RwLock<Vec<CaptureModel>>,
}

impl InMemoryCaptureRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captures recorded so far, oldest first
    pub async fn captures(&self) -> Vec<CaptureModel> {
        self.captures.read().await.clone()
    }

    pub async fn captures_for_room(&self, room_id: &str) -> Vec<CaptureModel> {
        self.captures
            .read()
            .await
            .iter()
            .filter(|capture| capture.room_id == room_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CaptureRepository for InMemoryCaptureRepository {
    #[instrument(skip(self))]
    async fn record_capture(&self, room_id: &str, image_path: &str) -> Result<(), HubError> {
        debug!(room_id = %room_id, image_path = %image_path, "Recording capture in memory");

        let capture = CaptureModel::new(room_id.to_string(), image_path.to_string());
        self.captures.write().await.push(capture);
        Ok(())
    }
}

/// MySQL implementation writing to the building's `Stranger` table
pub struct MySqlCaptureRepository {
    pool: MySqlPool,
}

impl MySqlCaptureRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Builds a pool that connects on first use, so an unreachable database
    /// only fails individual inserts
    pub fn connect_lazy(database_url: &str) -> Result<Self, HubError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| HubError::Config(format!("invalid database url: {}", e)))?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl CaptureRepository for MySqlCaptureRepository {
    #[instrument(skip(self))]
    async fn record_capture(&self, room_id: &str, image_path: &str) -> Result<(), HubError> {
        debug!(room_id = %room_id, image_path = %image_path, "Recording capture in database");

        sqlx::query("INSERT INTO Stranger (RoomNO, Img_path) VALUES (?, ?)")
            .bind(room_id)
            .bind(image_path)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, room_id = %room_id, "Failed to insert capture into database");
                HubError::Database(e.to_string())
            })?;

        debug!(room_id = %room_id, "Capture saved to database");
        Ok(())
    }
}
