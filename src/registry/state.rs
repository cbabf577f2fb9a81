//! Registry and pool under one lock
//!
//! Every mutation goes through [`HubState`], which keeps the pool's
//! reference counts equal to the number of subscribed variables that point
//! at each handle. The server wraps it in a single `RwLock`: broadcasts
//! take the read side, subscribe/unsubscribe/disconnect take the write side.

use std::collections::BTreeMap;

use crate::sim::{SimSource, SimValue};
use crate::transport::ClientId;

use super::pool::VariablePool;
use super::record::{SubscriptionRecord, VariableSpec};
use super::store::SubscriptionRegistry;

/// Result of a subscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscribeOutcome {
    /// Variables bound into the new record
    pub registered: usize,
    /// Variables the simulation source refused to allocate
    pub failed: usize,
}

/// Result of an unsubscribe or disconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnsubscribeOutcome {
    /// Records removed
    pub records: usize,
    /// Handles freed because nothing referenced them anymore
    pub freed: usize,
}

/// Current values for one record, ready to serialize
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub client_id: ClientId,
    pub correlation_token: String,
    pub values: BTreeMap<String, SimValue>,
}

/// Subscription registry plus variable pool
#[derive(Debug, Default)]
pub struct HubState {
    pool: VariablePool,
    registry: SubscriptionRegistry,
}

impl HubState {
    /// Create empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the variable pool
    pub fn pool(&self) -> &VariablePool {
        &self.pool
    }

    /// Get the subscription registry
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Create a record for `client_id` holding every variable that could be
    /// acquired
    ///
    /// The record is added even when it ends up empty.
    pub fn subscribe<S: SimSource + ?Sized>(
        &mut self,
        sim: &S,
        client_id: ClientId,
        correlation_token: &str,
        specs: &[VariableSpec],
    ) -> SubscribeOutcome {
        let mut record = SubscriptionRecord::new(client_id, correlation_token);
        let mut outcome = SubscribeOutcome::default();

        for spec in specs {
            match self.pool.acquire(sim, &spec.name, &spec.unit, spec.data_type) {
                Ok(handle) => {
                    record.add(handle, spec.name.as_str(), spec.alias.as_str());
                    outcome.registered += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        client = %record.client_id,
                        name = %spec.name,
                        error = %e,
                        "Skipping variable"
                    );
                    outcome.failed += 1;
                }
            }
        }

        tracing::info!(record = %record, "Subscription added");
        self.registry.add_record(record);
        outcome
    }

    /// Remove a client's records (all of them, or only those carrying
    /// `token`) and release their handles
    pub fn unsubscribe<S: SimSource + ?Sized>(
        &mut self,
        sim: &S,
        client_id: &ClientId,
        token: Option<&str>,
    ) -> UnsubscribeOutcome {
        let removed = self.registry.remove_records_for_client(client_id, token);
        let mut outcome = UnsubscribeOutcome {
            records: removed.len(),
            freed: 0,
        };

        for handle in removed.iter().flat_map(|r| r.handles()) {
            if self.pool.release(sim, handle) {
                outcome.freed += 1;
            }
        }

        if outcome.records > 0 {
            tracing::info!(
                client = %client_id,
                records = outcome.records,
                freed = outcome.freed,
                "Subscriptions removed"
            );
        }
        outcome
    }

    /// Build one snapshot per live record from the source's current values
    ///
    /// Variables without a current value are left out of their snapshot.
    pub fn snapshots<S: SimSource + ?Sized>(&self, sim: &S) -> Vec<Snapshot> {
        self.registry
            .all_records()
            .iter()
            .map(|record| {
                let values = record
                    .vars
                    .iter()
                    .filter_map(|var| {
                        let (_, data_type) = self.pool.lookup(var.handle)?;
                        let (raw, _) = sim.read_value(var.handle)?;
                        let value = SimValue::decode(data_type, &raw)?;
                        Some((var.alias.clone(), value))
                    })
                    .collect();

                Snapshot {
                    client_id: record.client_id.clone(),
                    correlation_token: record.correlation_token.clone(),
                    values,
                }
            })
            .collect()
    }

    /// Check that every pooled reference count matches the registry
    #[cfg(test)]
    pub(crate) fn ref_counts_consistent(&self) -> bool {
        let pooled = self.pool.stats();
        let pooled_ok = pooled
            .iter()
            .all(|s| s.ref_count as usize == self.registry.references(s.handle) && s.ref_count > 0);
        let records_ok = self
            .registry
            .all_records()
            .iter()
            .flat_map(|r| r.handles())
            .all(|h| self.pool.lookup(h).is_some());
        pooled_ok && records_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ConnectInfo, DataType, MemorySimSource};

    fn sim() -> MemorySimSource {
        MemorySimSource::new(ConnectInfo::default()).0
    }

    fn spec(name: &str, alias: &str) -> VariableSpec {
        VariableSpec::new(name, "degrees", DataType::Float64, alias)
    }

    #[test]
    fn test_two_clients_share_one_allocation() {
        let sim = sim();
        let mut state = HubState::new();
        let c1 = ClientId::new("c1");
        let c2 = ClientId::new("c2");

        state.subscribe(&sim, c1.clone(), "m1", &[spec("PLANE LATITUDE", "lat")]);
        state.subscribe(&sim, c2.clone(), "m2", &[spec("PLANE LATITUDE", "latitude")]);

        assert_eq!(sim.allocation_count(), 1);
        assert_eq!(state.pool().ref_count("PLANE LATITUDE"), Some(2));
        assert!(state.ref_counts_consistent());

        let handle = state.pool().get("PLANE LATITUDE").unwrap().handle;

        state.unsubscribe(&sim, &c1, None);
        assert_eq!(state.pool().ref_count("PLANE LATITUDE"), Some(1));
        assert!(sim.is_allocated(handle));
        assert!(state.ref_counts_consistent());

        let outcome = state.unsubscribe(&sim, &c2, None);
        assert_eq!(outcome, UnsubscribeOutcome { records: 1, freed: 1 });
        assert_eq!(state.pool().ref_count("PLANE LATITUDE"), None);
        assert_eq!(sim.free_count(), 1);
        assert!(state.ref_counts_consistent());
    }

    #[test]
    fn test_disconnect_releases_only_unreferenced() {
        let sim = sim();
        let mut state = HubState::new();
        let c1 = ClientId::new("c1");
        let c2 = ClientId::new("c2");

        state.subscribe(&sim, c1.clone(), "a", &[spec("A", "a"), spec("B", "b")]);
        state.subscribe(&sim, c1.clone(), "b", &[spec("B", "b"), spec("C", "c")]);
        state.subscribe(&sim, c1.clone(), "c", &[spec("D", "d")]);
        state.subscribe(&sim, c2.clone(), "x", &[spec("C", "c")]);

        let outcome = state.unsubscribe(&sim, &c1, None);

        assert_eq!(outcome.records, 3);
        // A, B and D are gone; C is still held by c2
        assert_eq!(outcome.freed, 3);
        assert_eq!(state.pool().len(), 1);
        assert_eq!(state.pool().ref_count("C"), Some(1));
        assert_eq!(state.registry().count(), 1);
        assert!(state.ref_counts_consistent());
    }

    #[test]
    fn test_same_var_twice_in_one_record() {
        let sim = sim();
        let mut state = HubState::new();
        let c1 = ClientId::new("c1");

        state.subscribe(&sim, c1.clone(), "m", &[spec("A", "a1"), spec("A", "a2")]);
        assert_eq!(state.pool().ref_count("A"), Some(2));
        assert!(state.ref_counts_consistent());

        let outcome = state.unsubscribe(&sim, &c1, None);
        assert_eq!(outcome.freed, 1);
        assert_eq!(sim.free_count(), 1);
    }

    #[test]
    fn test_scoped_unsubscribe() {
        let sim = sim();
        let mut state = HubState::new();
        let c1 = ClientId::new("c1");

        state.subscribe(&sim, c1.clone(), "map", &[spec("A", "a")]);
        state.subscribe(&sim, c1.clone(), "panel", &[spec("A", "a"), spec("B", "b")]);

        let outcome = state.unsubscribe(&sim, &c1, Some("panel"));
        assert_eq!(outcome, UnsubscribeOutcome { records: 1, freed: 1 });
        assert_eq!(state.pool().ref_count("A"), Some(1));
        assert_eq!(state.pool().ref_count("B"), None);
        assert!(state.ref_counts_consistent());
    }

    #[test]
    fn test_duplicate_subscribe_creates_second_record() {
        let sim = sim();
        let mut state = HubState::new();
        let c1 = ClientId::new("c1");

        state.subscribe(&sim, c1.clone(), "m", &[spec("A", "a")]);
        state.subscribe(&sim, c1.clone(), "m", &[spec("A", "a")]);

        assert_eq!(state.registry().count(), 2);
        assert_eq!(state.pool().ref_count("A"), Some(2));
        sim.set_value("A", SimValue::Float64(1.0));
        assert_eq!(state.snapshots(&sim).len(), 2);
    }

    #[test]
    fn test_empty_record_is_kept() {
        let sim = sim();
        let mut state = HubState::new();

        let outcome = state.subscribe(&sim, ClientId::new("c1"), "m", &[spec("", "x")]);

        assert_eq!(outcome, SubscribeOutcome { registered: 0, failed: 1 });
        assert_eq!(state.registry().count(), 1);
        assert!(state.registry().all_records()[0].vars.is_empty());
        assert!(state.ref_counts_consistent());
    }

    #[test]
    fn test_snapshot_values_by_alias() {
        let sim = sim();
        let mut state = HubState::new();

        state.subscribe(
            &sim,
            ClientId::new("c1"),
            "tok",
            &[spec("PLANE LATITUDE", "lat"), spec("PLANE LONGITUDE", "lon")],
        );
        sim.set_value("PLANE LATITUDE", SimValue::Float64(47.3));
        sim.set_value("PLANE LONGITUDE", SimValue::Float64(8.5));

        let snapshots = state.snapshots(&sim);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].correlation_token, "tok");
        assert_eq!(snapshots[0].values.get("lat"), Some(&SimValue::Float64(47.3)));
        assert_eq!(snapshots[0].values.get("lon"), Some(&SimValue::Float64(8.5)));
    }

    #[test]
    fn test_snapshot_omits_missing_values() {
        let sim = sim();
        let mut state = HubState::new();

        state.subscribe(
            &sim,
            ClientId::new("c1"),
            "tok",
            &[spec("PLANE LATITUDE", "lat"), spec("PLANE LONGITUDE", "lon")],
        );
        sim.set_value("PLANE LATITUDE", SimValue::Float64(47.3));

        let snapshots = state.snapshots(&sim);
        assert_eq!(snapshots[0].values.len(), 1);
        assert!(snapshots[0].values.contains_key("lat"));
    }

    #[test]
    fn test_snapshot_decodes_with_registered_type() {
        let sim = sim();
        let mut state = HubState::new();
        let c1 = ClientId::new("c1");

        state.subscribe(
            &sim,
            c1.clone(),
            "a",
            &[VariableSpec::new("TITLE", "", DataType::String64, "title")],
        );
        // A later registration with another type must not change decoding
        state.subscribe(
            &sim,
            c1,
            "b",
            &[VariableSpec::new("TITLE", "", DataType::Float64, "title")],
        );
        sim.set_value("TITLE", SimValue::Text("Cessna Skyhawk".into()));

        for snapshot in state.snapshots(&sim) {
            assert_eq!(
                snapshot.values.get("title"),
                Some(&SimValue::Text("Cessna Skyhawk".into()))
            );
        }
    }

    #[test]
    fn test_ref_counts_hold_over_mixed_sequence() {
        let sim = sim();
        let mut state = HubState::new();
        let clients: Vec<ClientId> = (0..4).map(|i| ClientId::new(format!("c{}", i))).collect();
        let names = ["A", "B", "C"];

        for step in 0..40usize {
            let client = &clients[step % clients.len()];
            if step % 3 == 2 {
                let token = if step % 2 == 0 { None } else { Some("m1") };
                state.unsubscribe(&sim, client, token);
            } else {
                let specs: Vec<_> = names
                    .iter()
                    .take(1 + step % names.len())
                    .map(|n| spec(n, n))
                    .collect();
                let token = format!("m{}", step % 2);
                state.subscribe(&sim, client.clone(), &token, &specs);
            }
            assert!(state.ref_counts_consistent(), "inconsistent at step {}", step);
        }

        for client in &clients {
            state.unsubscribe(&sim, client, None);
        }
        assert!(state.pool().is_empty());
        assert_eq!(sim.live_handle_count(), 0);
        assert_eq!(sim.allocation_count(), sim.free_count());
    }
}
