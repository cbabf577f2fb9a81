//! Diagnostics for the relay

use std::fmt::Write;
use std::time::Duration;

use crate::registry::{SubscriptionRecord, VariableStats};
use crate::transport::ClientId;

/// Title printed at the top of text dumps
const DUMP_TITLE: &str = "SimVar Relay";

/// Per-record statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStats {
    /// Owning client
    pub client_id: ClientId,
    /// Correlation token
    pub meta: String,
    /// (variable name, alias) pairs in record order
    pub vars: Vec<(String, String)>,
}

impl From<&SubscriptionRecord> for RecordStats {
    fn from(record: &SubscriptionRecord) -> Self {
        Self {
            client_id: record.client_id.clone(),
            meta: record.correlation_token.clone(),
            vars: record
                .vars
                .iter()
                .map(|v| (v.source_name.clone(), v.alias.clone()))
                .collect(),
        }
    }
}

/// Relay-wide statistics
#[derive(Debug, Clone, Default)]
pub struct HubStats {
    /// Whether the simulator session is live
    pub sim_connected: bool,
    /// Simulator version banner
    pub sim_banner: Option<String>,
    /// Time since the relay started
    pub uptime: Duration,
    /// Connected clients
    pub clients: Vec<ClientId>,
    /// Pooled variables
    pub variables: Vec<VariableStats>,
    /// Live subscription records
    pub records: Vec<RecordStats>,
}

impl HubStats {
    /// Text listing of pooled variables
    pub fn render_simvars(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}\n", DUMP_TITLE);
        self.write_simvars(&mut out);
        out
    }

    /// Full text dump: simulator, clients, variables, records
    pub fn render_debug(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}\n", DUMP_TITLE);

        if let Some(banner) = &self.sim_banner {
            let _ = writeln!(out, "{}\n", banner);
        }
        let _ = writeln!(
            out,
            "Simulator\n  connected: {}\n  uptime: {}s\n",
            self.sim_connected,
            self.uptime.as_secs()
        );

        let _ = writeln!(out, "Clients: {}", self.clients.len());
        for (i, client) in self.clients.iter().enumerate() {
            let _ = writeln!(out, "  {:02}: {}", i, client);
        }
        out.push('\n');

        self.write_simvars(&mut out);
        out.push_str("\n\n");

        let _ = writeln!(out, "Requests: {}", self.records.len());
        for (i, record) in self.records.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {:02}: Client: {} Vars: {} Meta: {}",
                i + 1,
                record.client_id,
                record.vars.len(),
                record.meta
            );
            for (j, (name, alias)) in record.vars.iter().enumerate() {
                let _ = writeln!(out, "    {:02}: name: {} moniker: {}", j, name, alias);
            }
        }
        out
    }

    fn write_simvars(&self, out: &mut String) {
        let _ = write!(out, "SimVars: {}", self.variables.len());
        for var in &self.variables {
            let _ = write!(
                out,
                "\n  {} name: {} unit: {} type: {} refs: {}",
                var.handle, var.name, var.unit, var.data_type, var.ref_count
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{DataType, VariableHandle};

    fn sample() -> HubStats {
        let mut record = SubscriptionRecord::new(ClientId::new("c1"), "map");
        record.add(VariableHandle(1), "PLANE LATITUDE", "lat");

        HubStats {
            sim_connected: true,
            sim_banner: Some("Flight Simulator says:\n Name: KittyHawk".into()),
            uptime: Duration::from_secs(42),
            clients: vec![ClientId::new("c1"), ClientId::new("c2")],
            variables: vec![VariableStats {
                name: "PLANE LATITUDE".into(),
                unit: "degrees".into(),
                data_type: DataType::Float64,
                handle: VariableHandle(1),
                ref_count: 1,
            }],
            records: vec![RecordStats::from(&record)],
        }
    }

    #[test]
    fn test_record_stats_from_record() {
        let stats = sample();
        assert_eq!(stats.records[0].meta, "map");
        assert_eq!(
            stats.records[0].vars,
            vec![("PLANE LATITUDE".to_string(), "lat".to_string())]
        );
    }

    #[test]
    fn test_render_simvars() {
        let text = sample().render_simvars();
        assert!(text.starts_with("SimVar Relay"));
        assert!(text.contains("SimVars: 1"));
        assert!(text.contains("#1 name: PLANE LATITUDE unit: degrees type: float64 refs: 1"));
    }

    #[test]
    fn test_render_debug() {
        let text = sample().render_debug();
        assert!(text.contains("Name: KittyHawk"));
        assert!(text.contains("connected: true"));
        assert!(text.contains("uptime: 42s"));
        assert!(text.contains("Clients: 2"));
        assert!(text.contains("  01: c2"));
        assert!(text.contains("Requests: 1"));
        assert!(text.contains("01: Client: c1 Vars: 1 Meta: map"));
        assert!(text.contains("00: name: PLANE LATITUDE moniker: lat"));
    }

    #[test]
    fn test_render_debug_empty() {
        let text = HubStats::default().render_debug();
        assert!(text.contains("connected: false"));
        assert!(text.contains("Clients: 0"));
        assert!(text.contains("SimVars: 0"));
        assert!(text.contains("Requests: 0"));
    }
}
