//! Per-client connection state

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;

use super::ClientId;

/// A connected client and its outbound queue
#[derive(Debug)]
pub struct ClientConnection {
    /// Connection identifier
    pub id: ClientId,
    /// Queue drained by the connection's writer task
    tx: mpsc::Sender<Bytes>,
    /// When the connection was established
    pub connected_at: Instant,
    /// Messages dropped because the queue was full or closed
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a connection around an outbound queue
    pub fn new(id: ClientId, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Queue a message without waiting
    ///
    /// Returns `false` and counts a drop if the queue is full or closed.
    pub fn send(&self, payload: Bytes) -> bool {
        if self.tx.try_send(payload).is_ok() {
            true
        } else {
            self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Total messages dropped for this connection
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
