//! Test assertion helpers for what peers observe on the wire
#![allow(dead_code)] // Test utilities may not all be used in every test

use tokio::time::Duration;

use super::actions::{TestClient, WAIT_LIMIT};

// ============================================================================
// Assertion Helpers
// ============================================================================

impl TestClient {
    /// Assert the next thing the hub wrote is exactly `expected`
    pub async fn expect_command(&mut self, expected: &str) {
        let received = self.read_command(WAIT_LIMIT).await;
        assert_eq!(
            received.as_deref(),
            Some(expected),
            "client should have received {:?}",
            expected
        );
    }

    /// Assert the hub writes nothing for a while and keeps the connection open
    pub async fn expect_silence(&mut self) {
        let received = self.read_command(Duration::from_millis(150)).await;
        assert!(
            received.is_none(),
            "client should not have received anything, got {:?}",
            received
        );
    }

    /// Assert the hub closes the connection
    pub async fn expect_closed(&mut self) {
        assert!(
            self.is_closed_by_hub(WAIT_LIMIT).await,
            "hub should have closed the connection"
        );
    }
}
