use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Duration, Instant};

use door_hub::capture::CaptureModel;
use door_hub::connection::{ConnectionId, Endpoint};
use door_hub::{Room, RoomRegistry};

use super::setup::TestHub;

/// How long helpers wait for the hub before failing a test
pub const WAIT_LIMIT: Duration = Duration::from_secs(2);

// ============================================================================
// Client Connections
// ============================================================================

/// Raw TCP peer speaking the hub's line-less command protocol
pub struct TestClient {
    pub stream: TcpStream,
}

impl TestClient {
    /// Send one command and give the hub a moment to read it on its own
    pub async fn send(&mut self, command: &str) {
        self.stream.write_all(command.as_bytes()).await.unwrap();
        sleep(Duration::from_millis(20)).await;
    }

    /// Next chunk the hub wrote, or `None` on close or timeout
    pub async fn read_command(&mut self, wait: Duration) -> Option<String> {
        let mut buffer = [0u8; 256];
        match timeout(wait, self.stream.read(&mut buffer)).await {
            Ok(Ok(0)) | Ok(Err(_)) | Err(_) => None,
            Ok(Ok(n)) => Some(String::from_utf8_lossy(&buffer[..n]).into_owned()),
        }
    }

    /// True once the hub has closed its side of the connection
    pub async fn is_closed_by_hub(&mut self, wait: Duration) -> bool {
        let mut buffer = [0u8; 256];
        matches!(
            timeout(wait, self.stream.read(&mut buffer)).await,
            Ok(Ok(0)) | Ok(Err(_))
        )
    }
}

// ============================================================================
// Action Helpers
// ============================================================================

impl TestHub {
    /// Open a TCP connection and send the identification line
    pub async fn connect(&self, identification: &str) -> TestClient {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(identification.as_bytes()).await.unwrap();
        TestClient { stream }
    }

    /// Connect a door device and wait until it owns the room's device slot
    pub async fn connect_device(&self, room_id: &str) -> TestClient {
        let previous = self.device_id(room_id).await;
        let client = self.connect(&format!("ESP32:room_{}", room_id)).await;
        self.wait_for_room(room_id, |room| {
            room.device
                .as_ref()
                .is_some_and(|device| Some(device.connection_id()) != previous)
        })
        .await;
        client
    }

    /// Connect a recognition worker and wait until it owns the worker slot
    pub async fn connect_worker(&self, room_id: &str) -> TestClient {
        let previous = self.worker_id(room_id).await;
        let client = self.connect(&format!("FR:room_{}", room_id)).await;
        self.wait_for_room(room_id, |room| {
            room.worker
                .as_ref()
                .is_some_and(|worker| Some(worker.connection_id()) != previous)
        })
        .await;
        client
    }

    /// Connect a web controller; it owns no slot, so only wait for the room entry
    pub async fn connect_web(&self, room_id: &str) -> TestClient {
        let client = self.connect(&format!("WEB:room_{}", room_id)).await;
        self.wait_for_room(room_id, |_| true).await;
        sleep(Duration::from_millis(20)).await;
        client
    }

    pub async fn device_id(&self, room_id: &str) -> Option<ConnectionId> {
        let room = self.rooms.find(room_id).await?;
        room.device.as_ref().map(|device| device.connection_id())
    }

    pub async fn worker_id(&self, room_id: &str) -> Option<ConnectionId> {
        let room = self.rooms.find(room_id).await?;
        room.worker.as_ref().map(|worker| worker.connection_id())
    }

    /// Poll the registry until the room exists and satisfies `predicate`
    pub async fn wait_for_room<F>(&self, room_id: &str, predicate: F) -> Room
    where
        F: Fn(&Room) -> bool,
    {
        let deadline = Instant::now() + WAIT_LIMIT;
        loop {
            if let Some(room) = self.rooms.find(room_id).await {
                if predicate(&room) {
                    return room;
                }
            }
            assert!(
                Instant::now() < deadline,
                "room {} never reached the expected state",
                room_id
            );
            sleep(Duration::from_millis(10)).await;
        }
    }

    /// Poll the registry until the room entry is gone
    pub async fn wait_for_room_removed(&self, room_id: &str) {
        let deadline = Instant::now() + WAIT_LIMIT;
        while self.rooms.find(room_id).await.is_some() {
            assert!(
                Instant::now() < deadline,
                "room {} was never removed",
                room_id
            );
            sleep(Duration::from_millis(10)).await;
        }
    }

    /// Poll the in-memory capture store until it holds `count` records
    pub async fn wait_for_captures(&self, count: usize) -> Vec<CaptureModel> {
        let deadline = Instant::now() + WAIT_LIMIT;
        loop {
            let captures = self.captures.captures().await;
            if captures.len() >= count {
                return captures;
            }
            assert!(
                Instant::now() < deadline,
                "expected {} captures, found {}",
                count,
                captures.len()
            );
            sleep(Duration::from_millis(10)).await;
        }
    }

    /// Cancel the hub and wait for the acceptor and all sessions to finish
    pub async fn stop(self) {
        self.shutdown.cancel();
        timeout(WAIT_LIMIT * 2, self.server_handle)
            .await
            .expect("hub did not stop in time")
            .unwrap()
            .unwrap();
    }
}
