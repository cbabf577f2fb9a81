//! Websocket session driver
//!
//! Runs one upgraded websocket from connect to disconnect: inbound frames
//! are handed to the [`ChannelTransport`] in arrival order, and a writer task
//! drains the connection's outbound queue onto the socket.
//!
//! When the client goes away the writer is stopped at once. On server
//! shutdown the connection is removed from the transport, which closes its
//! queue, and the writer gets up to `grace` to flush what is already queued.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;

use super::channel::ChannelTransport;

/// Why the read side of a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    ClientClosed,
    Shutdown,
}

/// Serve a websocket until either side closes it or shutdown is requested
pub async fn run_ws_session(
    transport: Arc<ChannelTransport>,
    ws: WebSocket,
    shutdown: CancellationToken,
    grace: Duration,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (client_id, mut outbound_rx) = transport.connect().await;

    let mut writer = tokio::spawn(async move {
        while let Some(payload) = outbound_rx.recv().await {
            let frame = match std::str::from_utf8(&payload) {
                Ok(text) => Message::Text(text.to_owned().into()),
                Err(_) => Message::Binary(payload),
            };
            if ws_tx.send(frame).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let end = loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break SessionEnd::Shutdown,
            frame = ws_rx.next() => match frame {
                Some(frame) => frame,
                None => break SessionEnd::ClientClosed,
            },
        };

        let payload = match frame {
            Ok(Message::Text(text)) => Bytes::from(text.as_str().to_owned()),
            Ok(Message::Binary(data)) => data,
            Ok(Message::Close(_)) => {
                tracing::debug!(client = %client_id, "Client sent close frame");
                break SessionEnd::ClientClosed;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Err(e) => {
                tracing::debug!(client = %client_id, error = %e, "Websocket read error");
                break SessionEnd::ClientClosed;
            }
        };

        transport.deliver(&client_id, payload).await;
    };

    // Dropping the connection closes its queue, so the writer ends once it
    // has sent everything already queued
    transport.disconnect(&client_id).await;

    match end {
        SessionEnd::ClientClosed => writer.abort(),
        SessionEnd::Shutdown => {
            if tokio::time::timeout(grace, &mut writer).await.is_err() {
                tracing::warn!(
                    client = %client_id,
                    grace = ?grace,
                    "Outbound queue not flushed within grace period"
                );
                writer.abort();
            }
        }
    }
}
