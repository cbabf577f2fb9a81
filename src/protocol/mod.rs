//! Client wire protocol
//!
//! Every message is a JSON object `{"type": ..., "meta": ..., "data": ...}`.
//! Inbound messages are decoded once into [`ClientMessage`], with each
//! variant carrying a statically shaped payload. Outbound messages are built
//! by the functions in [`outbound`].
//!
//! # Message Types
//!
//! | inbound `type` | payload | reply |
//! |---|---|---|
//! | `register` | `[{name, unit, type, moniker}]` | `simvars` on every data-ready |
//! | `deregister` | - | - |
//! | `echo` | anything | the same bytes |
//! | `ping` | - | `pong` with server time |
//! | `setdata` | `{name, unit, value}` | - |
//! | `teleport` | `{latitude, longitude, altitude, heading, airspeed}` | - |
//! | `airports` | `{latitude, longitude, radius?, maxAirports?, filter?}` | `airports` |
//!
//! The server additionally broadcasts `status` to every client on a timer.

pub mod error;
pub mod message;
pub mod outbound;

pub use error::ProtocolError;
pub use message::{AirportsRequest, ClientMessage, SetDataRequest, TeleportRequest};
