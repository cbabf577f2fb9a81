//! Shared relay context
//!
//! One [`HubContext`] is created per server and handed to every component
//! by `Arc`. It owns the registry/pool state and references the simulation
//! source, the transport and the optional airport lookup.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::airports::AirportLookup;
use crate::registry::HubState;
use crate::sim::SimSource;
use crate::stats::{HubStats, RecordStats};
use crate::transport::Transport;

use super::config::HubConfig;

/// Everything the router and dispatcher share
pub struct HubContext<S: SimSource, T: Transport> {
    /// Configuration
    pub config: HubConfig,

    /// Simulation source
    pub sim: Arc<S>,

    /// Client transport
    pub transport: Arc<T>,

    /// Registry and pool, behind one lock
    pub state: RwLock<HubState>,

    /// Airport search, if a database is loaded
    pub airports: Option<Arc<dyn AirportLookup>>,

    /// Version banner from the last simulator connect
    sim_banner: parking_lot::RwLock<Option<String>>,

    started_at: Instant,
}

impl<S: SimSource, T: Transport> HubContext<S, T> {
    /// Create a context with empty state
    pub fn new(config: HubConfig, sim: Arc<S>, transport: Arc<T>) -> Self {
        Self {
            config,
            sim,
            transport,
            state: RwLock::new(HubState::new()),
            airports: None,
            sim_banner: parking_lot::RwLock::new(None),
            started_at: Instant::now(),
        }
    }

    /// Attach an airport lookup
    pub fn with_airports(mut self, airports: Arc<dyn AirportLookup>) -> Self {
        self.airports = Some(airports);
        self
    }

    /// Remember the simulator's version banner
    pub fn set_sim_banner(&self, banner: String) {
        *self.sim_banner.write() = Some(banner);
    }

    /// The simulator's version banner, if connected at least once
    pub fn sim_banner(&self) -> Option<String> {
        self.sim_banner.read().clone()
    }

    /// Collect a diagnostics snapshot
    pub async fn stats(&self) -> HubStats {
        let state = self.state.read().await;
        let records = state
            .registry()
            .all_records()
            .iter()
            .map(RecordStats::from)
            .collect();

        HubStats {
            sim_connected: self.sim.is_connected(),
            sim_banner: self.sim_banner(),
            uptime: self.started_at.elapsed(),
            clients: self.transport.connection_ids(),
            variables: state.pool().stats(),
            records,
        }
    }
}
