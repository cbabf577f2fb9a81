//! Subscription registry implementation
//!
//! The ordered set of live subscription records. The registry only stores
//! records; keeping the variable pool's reference counts in step is the job
//! of [`HubState`](super::HubState).

use crate::sim::VariableHandle;
use crate::transport::ClientId;

use super::record::SubscriptionRecord;

/// Ordered set of live subscription records
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    records: Vec<SubscriptionRecord>,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    ///
    /// Records are never merged: subscribing twice with the same client and
    /// token yields two independent records.
    pub fn add_record(&mut self, record: SubscriptionRecord) {
        tracing::debug!(
            client = %record.client_id,
            meta = %record.correlation_token,
            vars = record.vars.len(),
            "Subscription record added"
        );
        self.records.push(record);
    }

    /// Remove every record owned by `client_id`, optionally only those
    /// carrying `token`, and return them in registry order
    pub fn remove_records_for_client(
        &mut self,
        client_id: &ClientId,
        token: Option<&str>,
    ) -> Vec<SubscriptionRecord> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| r.matches(client_id, token));
        self.records = kept;

        if !removed.is_empty() {
            tracing::debug!(
                client = %client_id,
                meta = ?token,
                removed = removed.len(),
                remaining = self.records.len(),
                "Subscription records removed"
            );
        }
        removed
    }

    /// All live records in insertion order
    pub fn all_records(&self) -> &[SubscriptionRecord] {
        &self.records
    }

    /// Number of live records
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Number of live records owned by a client
    pub fn count_for_client(&self, client_id: &ClientId) -> usize {
        self.records
            .iter()
            .filter(|r| &r.client_id == client_id)
            .count()
    }

    /// Number of subscribed variables, across all records, bound to `handle`
    pub fn references(&self, handle: VariableHandle) -> usize {
        self.records
            .iter()
            .flat_map(|r| r.handles())
            .filter(|h| *h == handle)
            .count()
    }
}
