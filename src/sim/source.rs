//! The `SimSource` trait and its event/handle types

use bytes::Bytes;

use super::value::DataType;

/// Simulation-side identifier of a registered variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableHandle(pub u32);

impl std::fmt::Display for VariableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Version information reported by the simulator when a session opens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectInfo {
    pub app_name: String,
    pub app_version: String,
    pub app_build: String,
    pub sim_version: String,
    pub sim_build: String,
}

impl ConnectInfo {
    /// Human-readable banner shown in diagnostics
    pub fn banner(&self) -> String {
        format!(
            concat!(
                "Flight Simulator says:\n",
                " Name: {}\n",
                " Version: {} (build {})\n",
                " SimConnect: {} (build {})"
            ),
            self.app_name,
            self.app_version,
            self.app_build,
            self.sim_version,
            self.sim_build
        )
    }
}

/// Asynchronous notification from the simulation source
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A session was opened
    Connected(ConnectInfo),
    /// The simulator closed the session
    Disconnected,
    /// New values are available for every registered variable
    DataReady,
    /// A subscribed simulation event fired
    Event(u32),
    /// The simulator rejected a request
    Exception(u32),
}

/// Errors reported by a simulation source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// No live session
    NotConnected,
    /// Opening a session failed
    OpenFailed(String),
    /// Registering a variable failed
    AllocationFailed { name: String, reason: String },
    /// Writing a value failed
    WriteFailed { name: String, reason: String },
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::NotConnected => write!(f, "Not connected to the simulator"),
            SimError::OpenFailed(reason) => write!(f, "Failed to open session: {}", reason),
            SimError::AllocationFailed { name, reason } => {
                write!(f, "Failed to register variable {}: {}", name, reason)
            }
            SimError::WriteFailed { name, reason } => {
                write!(f, "Failed to write variable {}: {}", name, reason)
            }
        }
    }
}

impl std::error::Error for SimError {}

/// Connector to the external simulator
///
/// Calls are synchronous and expected to return quickly; they are made while
/// the relay's registry lock is held, so implementations must not block on
/// network round trips.
pub trait SimSource: Send + Sync + 'static {
    /// Open a session under the given client name
    fn open(&self, name: &str) -> Result<(), SimError>;

    /// Close the current session
    fn close(&self) -> Result<(), SimError>;

    /// Whether a session is currently live
    fn is_connected(&self) -> bool;

    /// Register a variable and return its handle
    fn allocate_variable(
        &self,
        name: &str,
        unit: &str,
        data_type: DataType,
    ) -> Result<VariableHandle, SimError>;

    /// Release a previously allocated handle
    fn free_variable(&self, handle: VariableHandle);

    /// Latest raw value of a variable, if one has been received
    fn read_value(&self, handle: VariableHandle) -> Option<(Bytes, DataType)>;

    /// Write a value to a named variable
    fn write_value(
        &self,
        name: &str,
        unit: &str,
        value: f64,
        data_type: DataType,
    ) -> Result<(), SimError>;
}
