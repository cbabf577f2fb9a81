//! Relay configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::airports::{DEFAULT_MAX_AIRPORTS, DEFAULT_RADIUS_METERS};

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Address the HTTP/websocket server binds to
    pub bind_addr: SocketAddr,

    /// Client name announced to the simulator
    pub connection_name: String,

    /// Delay between simulator connection attempts
    pub connect_retry_interval: Duration,

    /// Give up connecting to the simulator after this long
    pub connect_timeout: Duration,

    /// Period of the `status` broadcast
    pub status_interval: Duration,

    /// How long shutdown waits for running tasks
    pub shutdown_grace: Duration,

    /// Outbound queue length per client
    pub client_buffer: usize,

    /// Airport search radius when a query gives none
    pub default_airport_radius_m: f64,

    /// Airport result limit when a query gives none
    pub default_max_airports: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            connection_name: "simvar-relay".to_string(),
            connect_retry_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(600),
            status_interval: Duration::from_millis(250),
            shutdown_grace: Duration::from_secs(3),
            client_buffer: 1024,
            default_airport_radius_m: DEFAULT_RADIUS_METERS,
            default_max_airports: DEFAULT_MAX_AIRPORTS,
        }
    }
}

impl HubConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the client name announced to the simulator
    pub fn connection_name(mut self, name: impl Into<String>) -> Self {
        self.connection_name = name.into();
        self
    }

    /// Set the simulator connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the delay between simulator connection attempts
    pub fn connect_retry_interval(mut self, interval: Duration) -> Self {
        self.connect_retry_interval = interval;
        self
    }

    /// Set the status broadcast period
    pub fn status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval;
        self
    }

    /// Set the shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Set the per-client outbound queue length (at least 1)
    pub fn client_buffer(mut self, size: usize) -> Self {
        self.client_buffer = size.max(1);
        self
    }
}
