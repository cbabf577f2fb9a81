//! Subscription registry and variable pool
//!
//! The registry tracks which client wants which variables, and the pool
//! makes sure each variable is registered with the simulator only once.
//!
//! # Architecture
//!
//! ```text
//!                       RwLock<HubState>
//!          ┌───────────────────────────────────────────┐
//!          │ registry: [SubscriptionRecord {           │
//!          │              client_id, meta,             │
//!          │              vars: [handle, alias] }]     │
//!          │ pool:     name ─► VariableEntry {         │
//!          │              handle, data_type, refs }    │
//!          └──────────────┬────────────────────────────┘
//!                         │
//!        ┌────────────────┼──────────────────┐
//!        │                │                  │
//!        ▼                ▼                  ▼
//!   subscribe()      unsubscribe()      snapshots()
//!   pool.acquire     pool.release       pool.lookup + SimSource::read_value
//!   (write lock)     (write lock)       (read lock)
//! ```
//!
//! For every pooled variable, the reference count equals the number of
//! subscribed variables across all records that point at its handle. The
//! handle is freed exactly when that count drops to zero.

pub mod entry;
pub mod pool;
pub mod record;
pub mod state;
pub mod store;

pub use entry::{VariableEntry, VariableStats};
pub use pool::VariablePool;
pub use record::{SubscribedVar, SubscriptionRecord, VariableSpec};
pub use state::{HubState, Snapshot, SubscribeOutcome, UnsubscribeOutcome};
pub use store::SubscriptionRegistry;
