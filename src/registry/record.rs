//! Subscription record types
//!
//! A record is one client's named subscription: a list of variables, each
//! paired with the alias the client wants to see it under, grouped behind
//! the correlation token (`meta`) that is echoed on every snapshot.

use crate::sim::{DataType, VariableHandle};
use crate::transport::ClientId;

/// A variable requested by a client, before it has a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSpec {
    /// Simulation variable name (e.g., "PLANE LATITUDE")
    pub name: String,
    /// Unit the value is requested in (e.g., "degrees")
    pub unit: String,
    /// Wire type of the value
    pub data_type: DataType,
    /// Output key in the snapshot
    pub alias: String,
}

impl VariableSpec {
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        data_type: DataType,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            data_type,
            alias: alias.into(),
        }
    }
}

/// A variable inside a record, bound to a pool handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribedVar {
    pub handle: VariableHandle,
    pub source_name: String,
    pub alias: String,
}

/// One client subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    /// Owning connection
    pub client_id: ClientId,
    /// Opaque token echoed as `meta` on each snapshot
    pub correlation_token: String,
    /// Variables in request order
    pub vars: Vec<SubscribedVar>,
}

impl SubscriptionRecord {
    /// Create an empty record
    pub fn new(client_id: ClientId, correlation_token: impl Into<String>) -> Self {
        Self {
            client_id,
            correlation_token: correlation_token.into(),
            vars: Vec::new(),
        }
    }

    /// Append a variable
    pub fn add(
        &mut self,
        handle: VariableHandle,
        source_name: impl Into<String>,
        alias: impl Into<String>,
    ) {
        self.vars.push(SubscribedVar {
            handle,
            source_name: source_name.into(),
            alias: alias.into(),
        });
    }

    /// Whether this record matches a client and, optionally, a token
    pub fn matches(&self, client_id: &ClientId, token: Option<&str>) -> bool {
        &self.client_id == client_id
            && token.map_or(true, |t| self.correlation_token == t)
    }

    /// Handles referenced by this record, one per variable
    pub fn handles(&self) -> impl Iterator<Item = VariableHandle> + '_ {
        self.vars.iter().map(|v| v.handle)
    }
}

impl std::fmt::Display for SubscriptionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "client={} meta={} vars={}",
            self.client_id,
            self.correlation_token,
            self.vars.len()
        )
    }
}
