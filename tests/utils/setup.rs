use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use door_hub::{
    CaptureRepository, HubConfig, HubError, HubState, InMemoryCaptureRepository,
    InMemoryRoomRegistry, Server,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestHub {
    pub addr: SocketAddr,
    pub rooms: Arc<InMemoryRoomRegistry>,
    pub captures: Arc<InMemoryCaptureRepository>,
    pub shutdown: CancellationToken,
    pub server_handle: JoinHandle<Result<(), HubError>>,
}

pub struct TestHubBuilder {
    write_timeout: Duration,
    capture_repository: Option<Arc<dyn CaptureRepository>>,
}

impl TestHubBuilder {
    pub fn new() -> Self {
        Self {
            write_timeout: Duration::from_secs(1),
            capture_repository: None,
        }
    }

    /// Persist captures somewhere other than the in-memory repository
    #[allow(dead_code)]
    pub fn with_capture_repository(mut self, repository: Arc<dyn CaptureRepository>) -> Self {
        self.capture_repository = Some(repository);
        self
    }

    pub async fn build(self) -> TestHub {
        let config = HubConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            write_timeout_ms: self.write_timeout.as_millis() as u64,
            shutdown_timeout_secs: 2,
            ..HubConfig::default()
        };

        let rooms = Arc::new(InMemoryRoomRegistry::new());
        let captures = Arc::new(InMemoryCaptureRepository::new());
        let capture_repository = self
            .capture_repository
            .unwrap_or_else(|| captures.clone() as Arc<dyn CaptureRepository>);

        let state = HubState::new(rooms.clone(), capture_repository, config.write_timeout());
        let server = Server::bind(&config, state).await.unwrap();
        let addr = server.local_addr().unwrap();

        let shutdown = CancellationToken::new();
        let server_handle = tokio::spawn(server.run(shutdown.clone()));

        TestHub {
            addr,
            rooms,
            captures,
            shutdown,
            server_handle,
        }
    }
}
