//! Inbound client messages

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::registry::VariableSpec;
use crate::sim::DataType;

use super::error::ProtocolError;

/// Outer shape shared by all messages
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    meta: Value,
    #[serde(default)]
    data: Value,
}

/// One entry of a `register` payload
#[derive(Debug, Deserialize)]
struct RegisterEntry {
    name: String,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default, rename = "type")]
    data_type: Option<String>,
    #[serde(default)]
    moniker: Option<String>,
}

impl RegisterEntry {
    fn into_spec(self) -> Option<VariableSpec> {
        if self.name.trim().is_empty() {
            return None;
        }

        let data_type = self
            .data_type
            .as_deref()
            .map(DataType::from_name)
            .unwrap_or(DataType::Float64);
        let alias = self
            .moniker
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.name.clone());

        Some(VariableSpec {
            name: self.name,
            unit: self.unit.unwrap_or_default(),
            data_type,
            alias,
        })
    }
}

/// Payload of `setdata`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetDataRequest {
    pub name: String,
    pub unit: String,
    pub value: f64,
}

/// Payload of `teleport`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TeleportRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub heading: f64,
    pub airspeed: f64,
}

/// Payload of `airports`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirportsRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub max_airports: Option<usize>,
    #[serde(default)]
    pub filter: Option<String>,
}

/// A decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Subscribe to a set of variables under a correlation token
    Register {
        meta: String,
        vars: Vec<VariableSpec>,
        /// Entries dropped because they were malformed
        skipped: usize,
    },
    /// Drop subscriptions (scoped to `meta` when it is non-empty)
    Deregister { meta: String },
    /// Send the raw message back unchanged
    Echo,
    /// Liveness probe
    Ping { meta: String },
    /// Write one variable
    SetData(SetDataRequest),
    /// Move the aircraft
    Teleport(TeleportRequest),
    /// Find airports near a position
    Airports { meta: String, request: AirportsRequest },
}

impl ClientMessage {
    /// Decode a raw message
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_slice(raw).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        let meta = meta_string(&envelope.meta);

        let message = match envelope.kind.as_str() {
            "register" => {
                let (vars, skipped) = decode_register(envelope.data);
                ClientMessage::Register {
                    meta,
                    vars,
                    skipped,
                }
            }
            "deregister" => ClientMessage::Deregister { meta },
            "echo" => ClientMessage::Echo,
            "ping" => ClientMessage::Ping { meta },
            "setdata" => ClientMessage::SetData(payload("setdata", envelope.data)?),
            "teleport" => ClientMessage::Teleport(payload("teleport", envelope.data)?),
            "airports" => ClientMessage::Airports {
                meta,
                request: payload("airports", envelope.data)?,
            },
            other => return Err(ProtocolError::UnknownType(other.to_string())),
        };
        Ok(message)
    }

    /// Wire name of the message type
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Register { .. } => "register",
            ClientMessage::Deregister { .. } => "deregister",
            ClientMessage::Echo => "echo",
            ClientMessage::Ping { .. } => "ping",
            ClientMessage::SetData(_) => "setdata",
            ClientMessage::Teleport(_) => "teleport",
            ClientMessage::Airports { .. } => "airports",
        }
    }
}

/// Tokens are opaque strings; non-string values are kept in their JSON form
fn meta_string(meta: &Value) -> String {
    match meta {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn payload<T: DeserializeOwned>(kind: &'static str, data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|e| ProtocolError::InvalidPayload {
        kind,
        reason: e.to_string(),
    })
}

/// Decode register entries one by one, skipping malformed ones
fn decode_register(data: Value) -> (Vec<VariableSpec>, usize) {
    let Value::Array(entries) = data else {
        tracing::debug!("register payload is not an array");
        return (Vec::new(), 0);
    };

    let mut vars = Vec::with_capacity(entries.len());
    let mut skipped = 0;

    for (index, entry) in entries.into_iter().enumerate() {
        let spec = serde_json::from_value::<RegisterEntry>(entry)
            .map_err(|e| e.to_string())
            .and_then(|e| e.into_spec().ok_or_else(|| "empty name".to_string()));

        match spec {
            Ok(spec) => vars.push(spec),
            Err(reason) => {
                tracing::debug!(
                    index = index,
                    reason = %reason,
                    "Skipping malformed register entry"
                );
                skipped += 1;
            }
        }
    }

    (vars, skipped)
}
