//! Connection table backed by per-client channels

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::connection::ClientConnection;
use super::{ClientId, Transport, TransportEvent};

/// Capacity of the inbound event queue shared by all connections
const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Transport over in-process channels
///
/// Connection drivers (such as the websocket session) call
/// [`connect`](Self::connect), [`deliver`](Self::deliver) and
/// [`disconnect`](Self::disconnect); the relay consumes the resulting
/// [`TransportEvent`]s and sends replies through [`Transport`].
pub struct ChannelTransport {
    connections: RwLock<HashMap<ClientId, Arc<ClientConnection>>>,
    event_tx: mpsc::Sender<TransportEvent>,
    client_buffer: usize,
}

impl ChannelTransport {
    /// Create a transport and the receiving end of its event stream
    ///
    /// `client_buffer` bounds each connection's outbound queue.
    pub fn new(client_buffer: usize) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let transport = Self {
            connections: RwLock::new(HashMap::new()),
            event_tx,
            client_buffer: client_buffer.max(1),
        };
        (transport, event_rx)
    }

    /// Register a new connection
    ///
    /// Returns its identifier and the queue of messages to write to it.
    pub async fn connect(&self) -> (ClientId, mpsc::Receiver<Bytes>) {
        let id = ClientId::generate();
        let (tx, rx) = mpsc::channel(self.client_buffer);
        self.connections
            .write()
            .insert(id.clone(), Arc::new(ClientConnection::new(id.clone(), tx)));

        tracing::info!(client = %id, "Client connected");
        self.emit(TransportEvent::Connected(id.clone())).await;
        (id, rx)
    }

    /// Hand an inbound message to the relay
    pub async fn deliver(&self, client_id: &ClientId, payload: Bytes) {
        self.emit(TransportEvent::Message(client_id.clone(), payload))
            .await;
    }

    /// Remove a connection
    pub async fn disconnect(&self, client_id: &ClientId) {
        let removed = self.connections.write().remove(client_id);
        if let Some(conn) = removed {
            tracing::info!(
                client = %client_id,
                age_secs = conn.age().as_secs(),
                dropped = conn.drop_count(),
                "Client disconnected"
            );
            self.emit(TransportEvent::Disconnected(client_id.clone()))
                .await;
        }
    }

    async fn emit(&self, event: TransportEvent) {
        if self.event_tx.send(event).await.is_err() {
            tracing::debug!("Transport event dropped, relay is not listening");
        }
    }
}

impl Transport for ChannelTransport {
    fn send(&self, client_id: &ClientId, payload: Bytes) -> bool {
        let conn = self.connections.read().get(client_id).cloned();
        match conn {
            Some(conn) => {
                let sent = conn.send(payload);
                if !sent {
                    tracing::warn!(client = %client_id, "Failed to queue message for client");
                }
                sent
            }
            None => {
                tracing::debug!(client = %client_id, "Send to absent client ignored");
                false
            }
        }
    }

    fn broadcast(&self, payload: Bytes) -> usize {
        let conns: Vec<Arc<ClientConnection>> =
            self.connections.read().values().cloned().collect();

        conns
            .iter()
            .filter(|conn| {
                let sent = conn.send(payload.clone());
                if !sent {
                    tracing::warn!(client = %conn.id, "Failed to queue broadcast for client");
                }
                sent
            })
            .count()
    }

    fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    fn connection_ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.connections.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_and_disconnect_events() {
        let (transport, mut events) = ChannelTransport::new(8);

        let (id, _rx) = transport.connect().await;
        assert_eq!(events.recv().await, Some(TransportEvent::Connected(id.clone())));
        assert_eq!(transport.connection_count(), 1);
        assert_eq!(transport.connection_ids(), vec![id.clone()]);

        transport.disconnect(&id).await;
        assert_eq!(events.recv().await, Some(TransportEvent::Disconnected(id.clone())));
        assert_eq!(transport.connection_count(), 0);

        // Second disconnect is silent
        transport.disconnect(&id).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_preserves_order() {
        let (transport, mut events) = ChannelTransport::new(8);
        let (id, _rx) = transport.connect().await;
        let _ = events.recv().await;

        transport.deliver(&id, Bytes::from_static(b"1")).await;
        transport.deliver(&id, Bytes::from_static(b"2")).await;

        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Message(id.clone(), Bytes::from_static(b"1")))
        );
        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Message(id, Bytes::from_static(b"2")))
        );
    }

    #[tokio::test]
    async fn test_send_routes_to_one_client() {
        let (transport, _events) = ChannelTransport::new(8);
        let (a, mut rx_a) = transport.connect().await;
        let (_b, mut rx_b) = transport.connect().await;

        assert!(transport.send(&a, Bytes::from_static(b"hi")));
        assert_eq!(rx_a.recv().await.unwrap(), Bytes::from_static(b"hi"));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_to_absent_client_is_noop() {
        let (transport, _events) = ChannelTransport::new(8);
        assert!(!transport.send(&ClientId::new("gone"), Bytes::from_static(b"x")));
    }

    #[tokio::test]
    async fn test_broadcast_skips_saturated_client() {
        let (transport, _events) = ChannelTransport::new(1);
        let (_a, mut rx_a) = transport.connect().await;
        let (b, _rx_b) = transport.connect().await;

        // Fill b's queue
        assert!(transport.send(&b, Bytes::from_static(b"fill")));

        let delivered = transport.broadcast(Bytes::from_static(b"status"));
        assert_eq!(delivered, 1);
        assert_eq!(rx_a.recv().await.unwrap(), Bytes::from_static(b"status"));
    }
}
