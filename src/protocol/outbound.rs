//! Outbound message builders
//!
//! Field order on the wire is always `type`, `meta`, `data`; `meta` is left
//! out of messages that are not replies to a client token.

use bytes::Bytes;
use serde::Serialize;

use crate::airports::Airport;
use crate::registry::Snapshot;

use super::error::ProtocolError;

#[derive(Debug, Serialize)]
struct OutboundMessage<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<&'a str>,
    data: T,
}

#[derive(Debug, Serialize)]
struct StatusData {
    simconnect: bool,
}

#[derive(Debug, Serialize)]
struct AirportEntry<'a> {
    #[serde(rename = "type")]
    airport_type: &'static str,
    icao: &'a str,
    name: &'a str,
    latitude: String,
    longitude: String,
    elevation: String,
}

impl<'a> From<&'a Airport> for AirportEntry<'a> {
    fn from(airport: &'a Airport) -> Self {
        Self {
            airport_type: airport.airport_type.as_str(),
            icao: &airport.icao,
            name: &airport.name,
            latitude: airport.latitude_deg.to_string(),
            longitude: airport.longitude_deg.to_string(),
            elevation: airport.elevation_ft.to_string(),
        }
    }
}

fn encode<T: Serialize>(kind: &str, meta: Option<&str>, data: T) -> Result<Bytes, ProtocolError> {
    let message = OutboundMessage { kind, meta, data };
    serde_json::to_vec(&message)
        .map(Bytes::from)
        .map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// `{"type":"simvars","meta":<token>,"data":{<alias>:<value>,...}}`
pub fn simvars(snapshot: &Snapshot) -> Result<Bytes, ProtocolError> {
    encode(
        "simvars",
        Some(snapshot.correlation_token.as_str()),
        &snapshot.values,
    )
}

/// `{"type":"status","data":{"simconnect":<bool>}}`
pub fn status(sim_connected: bool) -> Result<Bytes, ProtocolError> {
    encode(
        "status",
        None,
        StatusData {
            simconnect: sim_connected,
        },
    )
}

/// `{"type":"pong","meta":<meta>,"data":<timestamp>}`
pub fn pong(meta: &str, timestamp: &str) -> Result<Bytes, ProtocolError> {
    encode("pong", Some(meta), timestamp)
}

/// `{"type":"airports","meta":<meta>,"data":[{type,icao,name,latitude,longitude,elevation}]}`
pub fn airports(meta: &str, airports: &[Airport]) -> Result<Bytes, ProtocolError> {
    let entries: Vec<AirportEntry<'_>> = airports.iter().map(AirportEntry::from).collect();
    encode("airports", Some(meta), entries)
}
