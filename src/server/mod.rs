//! Relay server
//!
//! [`HubServer`] wires the pieces together: the HTTP/websocket listener
//! feeds a [`MessageRouter`], and a [`BroadcastDispatcher`] pushes
//! snapshots and status back out. Both share one [`HubContext`].

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod http;
pub mod listener;
pub mod router;

pub use config::HubConfig;
pub use context::HubContext;
pub use dispatcher::BroadcastDispatcher;
pub use listener::HubServer;
pub use router::MessageRouter;
