//! Inbound message routing
//!
//! Consumes [`TransportEvent`]s one at a time, so messages from a single
//! client are always handled in arrival order. Each message is decoded once
//! into a [`ClientMessage`] and handed to exactly one handler. Nothing a
//! client sends can stop the loop: malformed and unknown messages are logged
//! and dropped.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::airports::{AirportFilter, AirportQuery};
use crate::protocol::{
    outbound, AirportsRequest, ClientMessage, ProtocolError, SetDataRequest, TeleportRequest,
};
use crate::registry::VariableSpec;
use crate::sim::{DataType, SimSource};
use crate::transport::{ClientId, Transport, TransportEvent};

use super::context::HubContext;

/// Routes client messages to their handlers
pub struct MessageRouter<S: SimSource, T: Transport> {
    ctx: Arc<HubContext<S, T>>,
}

impl<S: SimSource, T: Transport> Clone for MessageRouter<S, T> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
        }
    }
}

impl<S: SimSource, T: Transport> MessageRouter<S, T> {
    /// Create a router over a shared context
    pub fn new(ctx: Arc<HubContext<S, T>>) -> Self {
        Self { ctx }
    }

    /// Process transport events until shutdown or until the stream ends
    pub async fn run(
        self,
        mut events: mpsc::Receiver<TransportEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }
        tracing::info!("Stopped routing client messages");
    }

    /// Handle one transport event
    pub async fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected(client_id) => {
                tracing::debug!(client = %client_id, "Router saw new client");
            }
            TransportEvent::Disconnected(client_id) => self.handle_disconnect(&client_id).await,
            TransportEvent::Message(client_id, raw) => self.handle_message(&client_id, raw).await,
        }
    }

    /// Drop every record of a client that went away
    pub async fn handle_disconnect(&self, client_id: &ClientId) {
        let mut state = self.ctx.state.write().await;
        state.unsubscribe(&*self.ctx.sim, client_id, None);
    }

    /// Decode and dispatch one raw message
    pub async fn handle_message(&self, client_id: &ClientId, raw: Bytes) {
        let message = match ClientMessage::decode(&raw) {
            Ok(message) => message,
            Err(ProtocolError::UnknownType(kind)) => {
                tracing::warn!(
                    client = %client_id,
                    kind = %kind,
                    "Received message with unknown type"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(client = %client_id, error = %e, "Dropping malformed message");
                return;
            }
        };

        tracing::debug!(client = %client_id, kind = message.kind(), "Message received");

        match message {
            ClientMessage::Register {
                meta,
                vars,
                skipped,
            } => self.handle_register(client_id, &meta, &vars, skipped).await,
            ClientMessage::Deregister { meta } => self.handle_deregister(client_id, &meta).await,
            ClientMessage::Echo => self.handle_echo(client_id, raw),
            ClientMessage::Ping { meta } => self.handle_ping(client_id, &meta),
            ClientMessage::SetData(request) => self.handle_set_data(&request),
            ClientMessage::Teleport(request) => self.handle_teleport(&request),
            ClientMessage::Airports { meta, request } => {
                self.handle_airports(client_id, meta, request);
            }
        }
    }

    async fn handle_register(
        &self,
        client_id: &ClientId,
        meta: &str,
        vars: &[VariableSpec],
        skipped: usize,
    ) {
        if skipped > 0 {
            tracing::warn!(
                client = %client_id,
                meta = meta,
                skipped = skipped,
                "Skipped malformed variables"
            );
        }

        let mut state = self.ctx.state.write().await;
        state.subscribe(&*self.ctx.sim, client_id.clone(), meta, vars);
    }

    async fn handle_deregister(&self, client_id: &ClientId, meta: &str) {
        let token = (!meta.is_empty()).then_some(meta);
        let mut state = self.ctx.state.write().await;
        state.unsubscribe(&*self.ctx.sim, client_id, token);
    }

    fn handle_echo(&self, client_id: &ClientId, raw: Bytes) {
        self.ctx.transport.send(client_id, raw);
    }

    fn handle_ping(&self, client_id: &ClientId, meta: &str) {
        let now = chrono::Utc::now().to_rfc3339();
        match outbound::pong(meta, &now) {
            Ok(reply) => {
                self.ctx.transport.send(client_id, reply);
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode pong"),
        }
    }

    fn handle_set_data(&self, request: &SetDataRequest) {
        if !self.ctx.sim.is_connected() {
            tracing::warn!(
                name = %request.name,
                "Not connected to the simulator, ignoring setdata"
            );
            return;
        }

        if let Err(e) = self.ctx.sim.write_value(
            &request.name,
            &request.unit,
            request.value,
            DataType::Float64,
        ) {
            tracing::error!(name = %request.name, error = %e, "Failed to write variable");
        }
    }

    fn handle_teleport(&self, request: &TeleportRequest) {
        if !self.ctx.sim.is_connected() {
            tracing::warn!("Not connected to the simulator, ignoring teleport");
            return;
        }

        // Each write lands on its own; a partial teleport is visible until the last one
        let writes = [
            ("PLANE LATITUDE", "degrees", request.latitude),
            ("PLANE LONGITUDE", "degrees", request.longitude),
            ("PLANE ALTITUDE", "feet", request.altitude),
            ("PLANE HEADING DEGREES TRUE", "degrees", request.heading),
            ("AIRSPEED TRUE", "knot", request.airspeed),
            ("PLANE BANK DEGREES", "degrees", 0.0),
            ("PLANE PITCH DEGREES", "degrees", 0.0),
        ];
        for (name, unit, value) in writes {
            if let Err(e) = self.ctx.sim.write_value(name, unit, value, DataType::Float64) {
                tracing::error!(name = name, error = %e, "Failed to write teleport field");
            }
        }

        tracing::info!(
            lat = request.latitude,
            lon = request.longitude,
            alt = request.altitude,
            hdg = request.heading,
            spd = request.airspeed,
            "Teleporting"
        );
    }

    /// Start an airport search off the message loop
    ///
    /// Returns `None` when no airport database is loaded; the client gets no
    /// reply in that case.
    fn handle_airports(
        &self,
        client_id: &ClientId,
        meta: String,
        request: AirportsRequest,
    ) -> Option<tokio::task::JoinHandle<()>> {
        let Some(lookup) = self.ctx.airports.clone() else {
            tracing::warn!(client = %client_id, "Airports database not available");
            return None;
        };

        let config = &self.ctx.config;
        let query = AirportQuery {
            latitude: request.latitude,
            longitude: request.longitude,
            radius_meters: request.radius.unwrap_or(config.default_airport_radius_m),
            max_airports: request.max_airports.unwrap_or(config.default_max_airports),
            filter: request
                .filter
                .as_deref()
                .map(AirportFilter::parse)
                .unwrap_or_default(),
        };

        let ctx = Arc::clone(&self.ctx);
        let client_id = client_id.clone();

        Some(tokio::spawn(async move {
            let found = match tokio::task::spawn_blocking(move || {
                let found = lookup.find_nearest(&query);
                (query, found)
            })
            .await
            {
                Ok((query, found)) => {
                    if found.is_empty() {
                        tracing::info!(
                            lat = query.latitude,
                            lon = query.longitude,
                            "No airports found"
                        );
                    }
                    found
                }
                Err(e) => {
                    tracing::error!(error = %e, "Airport search failed");
                    return;
                }
            };

            tracing::info!(client = %client_id, count = found.len(), "Found airports");
            match outbound::airports(&meta, &found) {
                Ok(reply) => {
                    ctx.transport.send(&client_id, reply);
                }
                Err(e) => tracing::error!(error = %e, "Failed to encode airports reply"),
            }
        }))
    }
}
