//! Variable pool entries
//!
//! One entry per distinct variable name, holding the shared simulation
//! handle and the number of subscribed variables that reference it.

use crate::sim::{DataType, VariableHandle};

/// A pooled simulation variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableEntry {
    /// Variable name (the pool key)
    pub name: String,

    /// Unit from the first registration
    pub unit: String,

    /// Data type from the first registration; authoritative for decoding
    pub data_type: DataType,

    /// Handle returned by the simulation source
    pub handle: VariableHandle,

    /// Number of live subscribed variables referencing `handle`
    pub(super) ref_count: u32,
}

impl VariableEntry {
    pub(super) fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        data_type: DataType,
        handle: VariableHandle,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            data_type,
            handle,
            ref_count: 1,
        }
    }

    /// Get the reference count
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// Whether a later registration disagrees with the stored unit or type
    pub fn conflicts_with(&self, unit: &str, data_type: DataType) -> bool {
        self.unit != unit || self.data_type != data_type
    }
}

/// Diagnostics view of a pool entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableStats {
    pub name: String,
    pub unit: String,
    pub data_type: DataType,
    pub handle: VariableHandle,
    pub ref_count: u32,
}

impl From<&VariableEntry> for VariableStats {
    fn from(entry: &VariableEntry) -> Self {
        Self {
            name: entry.name.clone(),
            unit: entry.unit.clone(),
            data_type: entry.data_type,
            handle: entry.handle,
            ref_count: entry.ref_count,
        }
    }
}
