use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::shared::HubError;

/// Relay hub for door-lock controllers, face-recognition workers and the web backend
#[derive(Parser, Clone, Debug)]
#[command(name = "door-hub", version, about = "Room relay hub for door devices")]
pub struct HubConfig {
    /// Bind address
    #[arg(long, env = "HUB_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Port to listen on
    #[arg(long, env = "HUB_PORT", default_value_t = 9000)]
    pub port: u16,

    /// MySQL URL for captured-image records; captures stay in memory when unset
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Upper bound on any single write to a peer, in milliseconds
    #[arg(long, env = "HUB_WRITE_TIMEOUT_MS", default_value_t = 3000)]
    pub write_timeout_ms: u64,

    /// How long shutdown waits for sessions to finish, in seconds
    #[arg(long, env = "HUB_SHUTDOWN_TIMEOUT_SECS", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 9000,
            database_url: None,
            write_timeout_ms: 3000,
            shutdown_timeout_secs: 10,
        }
    }
}

impl HubConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, HubError> {
        let ip: IpAddr = self.bind_address.parse().map_err(|e| {
            HubError::Config(format!("invalid bind address {:?}: {}", self.bind_address, e))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
