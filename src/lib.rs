//! Websocket relay for live flight simulator variables
//!
//! Clients connect over a websocket and register sets of simulator
//! variables under a correlation token (`meta`). Each variable is registered
//! with the simulator once, no matter how many clients want it, and released
//! when the last subscriber goes away. Whenever the simulator reports fresh
//! data, every subscription record receives its own `simvars` message with
//! values keyed by the client's chosen aliases.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use simvar_relay::sim::{ConnectInfo, MemorySimSource};
//! use simvar_relay::{HubConfig, HubServer};
//!
//! # async fn run() -> simvar_relay::Result<()> {
//! let (sim, sim_events) = MemorySimSource::new(ConnectInfo::default());
//! let config = HubConfig::with_addr("127.0.0.1:9000".parse().unwrap());
//!
//! HubServer::new(config, Arc::new(sim), sim_events)
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! # }
//! ```

pub mod airports;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod sim;
pub mod stats;
pub mod transport;

pub use error::{Error, Result};
pub use server::{HubConfig, HubServer};
