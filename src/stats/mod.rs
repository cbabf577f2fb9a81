//! Statistics and diagnostics

pub mod metrics;

pub use metrics::{HubStats, RecordStats};
