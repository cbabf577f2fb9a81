//! Outbound broadcast timelines
//!
//! Two loops push data to clients:
//!
//! - the simulation event loop, which answers every `DataReady` with one
//!   `simvars` message per subscription record
//! - the status loop, which tells every connected client whether the
//!   simulator session is up
//!
//! Snapshots are taken under the state read lock; the lock is released
//! before anything is encoded or sent.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::protocol::outbound;
use crate::sim::{SimEvent, SimSource};
use crate::transport::Transport;

use super::context::HubContext;

/// Pushes snapshots and status to clients
pub struct BroadcastDispatcher<S: SimSource, T: Transport> {
    ctx: Arc<HubContext<S, T>>,
}

impl<S: SimSource, T: Transport> Clone for BroadcastDispatcher<S, T> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
        }
    }
}

impl<S: SimSource, T: Transport> BroadcastDispatcher<S, T> {
    /// Create a dispatcher over a shared context
    pub fn new(ctx: Arc<HubContext<S, T>>) -> Self {
        Self { ctx }
    }

    /// Send one `simvars` message per subscription record
    ///
    /// Returns the number of messages the transport accepted.
    pub async fn publish_snapshots(&self) -> usize {
        let snapshots = {
            let state = self.ctx.state.read().await;
            state.snapshots(&*self.ctx.sim)
        };

        let mut delivered = 0;
        for snapshot in &snapshots {
            match outbound::simvars(snapshot) {
                Ok(message) => {
                    if self.ctx.transport.send(&snapshot.client_id, message) {
                        delivered += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        client = %snapshot.client_id,
                        meta = %snapshot.correlation_token,
                        error = %e,
                        "Failed to encode snapshot"
                    );
                }
            }
        }

        tracing::trace!(records = snapshots.len(), delivered = delivered, "Published snapshots");
        delivered
    }

    /// Send `status` to every connected client
    pub fn broadcast_status(&self) -> usize {
        match outbound::status(self.ctx.sim.is_connected()) {
            Ok(message) => self.ctx.transport.broadcast(message),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode status");
                0
            }
        }
    }

    /// React to one simulation event
    ///
    /// Breaks when the simulator session has ended.
    pub async fn handle_sim_event(&self, event: SimEvent) -> ControlFlow<()> {
        match event {
            SimEvent::DataReady => {
                self.publish_snapshots().await;
            }
            SimEvent::Connected(info) => {
                let banner = info.banner();
                tracing::info!(
                    app = %info.app_name,
                    version = %info.app_version,
                    build = %info.app_build,
                    "Simulator connected"
                );
                self.ctx.set_sim_banner(banner);
            }
            SimEvent::Disconnected => {
                tracing::info!("Simulator has quit");
                return ControlFlow::Break(());
            }
            SimEvent::Event(id) => {
                tracing::info!(event = id, "Simulator event");
            }
            SimEvent::Exception(code) => {
                tracing::error!(code = code, "Simulator exception");
            }
        }
        ControlFlow::Continue(())
    }

    /// Consume simulation events until shutdown
    ///
    /// A simulator quit requests shutdown of the whole relay.
    pub async fn run_sim_events(
        self,
        mut events: mpsc::Receiver<SimEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => event,
            };

            let Some(event) = event else {
                tracing::warn!("Simulation event stream closed");
                shutdown.cancel();
                break;
            };

            if self.handle_sim_event(event).await.is_break() {
                shutdown.cancel();
                break;
            }
        }
        tracing::info!("Stopped dispatching simulation events");
    }

    /// Broadcast status on the configured period until shutdown
    pub async fn run_status(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.ctx.config.status_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.broadcast_status();
                }
            }
        }
        tracing::debug!("Stopped status broadcast");
    }
}
