//! Reference-counted pool of simulation variables
//!
//! The pool is the deduplication point: however many clients ask for
//! `PLANE LATITUDE`, the simulation source sees exactly one allocation, and
//! the handle is freed when the last reference goes away.

use std::collections::HashMap;

use crate::sim::{DataType, SimError, SimSource, VariableHandle};

use super::entry::{VariableEntry, VariableStats};

/// Pool of live simulation variables keyed by name
#[derive(Debug, Default)]
pub struct VariablePool {
    /// Entries keyed by variable name
    entries: HashMap<String, VariableEntry>,

    /// Reverse index from handle to name
    names: HashMap<VariableHandle, String>,
}

impl VariablePool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a reference to a variable, allocating it on first use
    ///
    /// The first registration of a name fixes its unit and data type. Later
    /// registrations with a different unit or type share the existing handle.
    pub fn acquire<S: SimSource + ?Sized>(
        &mut self,
        sim: &S,
        name: &str,
        unit: &str,
        data_type: DataType,
    ) -> Result<VariableHandle, SimError> {
        if let Some(entry) = self.entries.get_mut(name) {
            if entry.conflicts_with(unit, data_type) {
                tracing::warn!(
                    name = name,
                    unit = unit,
                    data_type = %data_type,
                    registered_unit = %entry.unit,
                    registered_type = %entry.data_type,
                    "Variable already registered with a different unit or type, keeping the first"
                );
            }
            entry.ref_count += 1;

            tracing::debug!(
                name = name,
                handle = %entry.handle,
                ref_count = entry.ref_count,
                "Variable reference added"
            );
            return Ok(entry.handle);
        }

        let handle = sim.allocate_variable(name, unit, data_type)?;
        self.entries.insert(
            name.to_string(),
            VariableEntry::new(name, unit, data_type, handle),
        );
        self.names.insert(handle, name.to_string());

        tracing::info!(
            name = name,
            unit = unit,
            data_type = %data_type,
            handle = %handle,
            "Variable registered"
        );
        Ok(handle)
    }

    /// Drop a reference to a handle, freeing it when none remain
    ///
    /// Returns `true` if the handle was freed. Unknown handles are ignored.
    pub fn release<S: SimSource + ?Sized>(&mut self, sim: &S, handle: VariableHandle) -> bool {
        let Some(name) = self.names.get(&handle) else {
            tracing::debug!(handle = %handle, "Release of unknown handle ignored");
            return false;
        };

        let Some(entry) = self.entries.get_mut(name) else {
            return false;
        };

        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 {
            tracing::debug!(
                name = %entry.name,
                handle = %handle,
                ref_count = entry.ref_count,
                "Variable reference dropped"
            );
            return false;
        }

        if let Some(name) = self.names.remove(&handle) {
            self.entries.remove(&name);
            tracing::info!(name = %name, handle = %handle, "Variable released");
        }
        sim.free_variable(handle);
        true
    }

    /// Name and authoritative data type for a handle
    pub fn lookup(&self, handle: VariableHandle) -> Option<(&str, DataType)> {
        let name = self.names.get(&handle)?;
        let entry = self.entries.get(name)?;
        Some((entry.name.as_str(), entry.data_type))
    }

    /// Get an entry by variable name
    pub fn get(&self, name: &str) -> Option<&VariableEntry> {
        self.entries.get(name)
    }

    /// Reference count for a variable name (`None` if not pooled)
    pub fn ref_count(&self, name: &str) -> Option<u32> {
        self.entries.get(name).map(VariableEntry::ref_count)
    }

    /// Number of pooled variables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diagnostics for every entry, sorted by handle
    pub fn stats(&self) -> Vec<VariableStats> {
        let mut stats: Vec<VariableStats> =
            self.entries.values().map(VariableStats::from).collect();
        stats.sort_by_key(|s| s.handle);
        stats
    }
}
