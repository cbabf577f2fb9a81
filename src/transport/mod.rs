//! Client connection transport
//!
//! The relay sees clients only through the [`Transport`] trait (outbound)
//! and a stream of [`TransportEvent`]s (inbound). [`ChannelTransport`] keeps
//! one bounded outbound queue per connection; [`run_ws_session`] drives a
//! single websocket against it.

pub mod channel;
pub mod connection;
pub mod session;

use std::sync::Arc;

use bytes::Bytes;

pub use channel::ChannelTransport;
pub use connection::ClientConnection;
pub use session::run_ws_session;

/// Opaque identifier of one live connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(Arc<str>);

impl ClientId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(Arc::from(id.into()))
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inbound connection event
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A client connected
    Connected(ClientId),
    /// A client disconnected
    Disconnected(ClientId),
    /// A client sent a message
    Message(ClientId, Bytes),
}

/// Outbound side of the client transport
///
/// Sends never block: a message that cannot be queued for a client is
/// dropped for that client only.
pub trait Transport: Send + Sync + 'static {
    /// Queue a message for one client; `false` if it is gone or saturated
    fn send(&self, client_id: &ClientId, payload: Bytes) -> bool;

    /// Queue a message for every connected client; returns how many accepted it
    fn broadcast(&self, payload: Bytes) -> usize;

    /// Number of connected clients
    fn connection_count(&self) -> usize;

    /// Identifiers of connected clients
    fn connection_ids(&self) -> Vec<ClientId>;
}
