//! Protocol error types

/// Error decoding or encoding a client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The message is not a JSON object with a string `type`
    InvalidJson(String),
    /// The `type` tag is not one the relay understands
    UnknownType(String),
    /// The payload does not have the shape the type requires
    InvalidPayload { kind: &'static str, reason: String },
    /// An outbound message could not be serialized
    Encode(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::InvalidJson(reason) => write!(f, "Invalid JSON: {}", reason),
            ProtocolError::UnknownType(kind) => write!(f, "Unknown message type: {}", kind),
            ProtocolError::InvalidPayload { kind, reason } => {
                write!(f, "Invalid {} payload: {}", kind, reason)
            }
            ProtocolError::Encode(reason) => write!(f, "Failed to encode message: {}", reason),
        }
    }
}

impl std::error::Error for ProtocolError {}
