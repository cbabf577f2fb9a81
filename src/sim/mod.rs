//! Simulation source boundary
//!
//! The relay never talks to the simulator directly. Everything it needs is
//! expressed by the [`SimSource`] trait: opening a session, registering
//! variables (which yields a [`VariableHandle`]), reading raw values, and
//! writing values back. Asynchronous notifications (session opened, data
//! ready, simulator quit) arrive separately as a stream of [`SimEvent`]s.
//!
//! [`MemorySimSource`] is an in-process implementation used by the tests and
//! the demo server.

pub mod connect;
pub mod memory;
pub mod source;
pub mod value;

pub use connect::connect_with_retry;
pub use memory::{MemorySimSource, WriteRecord};
pub use source::{ConnectInfo, SimError, SimEvent, SimSource, VariableHandle};
pub use value::{DataType, SimValue};
