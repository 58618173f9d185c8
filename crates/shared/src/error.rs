//! Error taxonomy shared by the transport and the orchestration layer.

use serde_json::Value;

/// Message used when a response declared as JSON cannot be decoded.
pub const RESPONSE_PARSE_ERROR: &str = "Error parsing API response";

/// Errors surfaced by the client.
///
/// Connection level errors (`Configuration`, `Transport`) become
/// `status/websocketError` events. Per-request errors (`Remote`, `Decode`)
/// become `<type>Error` events and never stop the dispatch loop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// Connection prerequisites such as the CSRF token are missing.
    #[error("{0}")]
    Configuration(String),
    /// The socket reported an error or is not usable.
    #[error("{0}")]
    Transport(String),
    /// The server answered a request with an error.
    #[error("remote error: {0}")]
    Remote(Value),
    /// An inbound payload could not be decoded.
    #[error("{0}")]
    Decode(String),
    /// An outbound message could not be serialized.
    #[error("failed to serialize message: {0}")]
    Serialize(String),
}

impl ClientError {
    /// Build a remote error from a response's `error` field.
    ///
    /// The API does not consistently return JSON, so a string that does not
    /// parse is kept verbatim.
    pub fn remote(raw: &Value) -> Self {
        match raw {
            Value::String(s) => ClientError::Remote(
                serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
            ),
            other => ClientError::Remote(other.clone()),
        }
    }

    /// The payload carried by the `error: true` event for this error.
    pub fn to_payload(&self) -> Value {
        match self {
            ClientError::Remote(detail) => detail.clone(),
            other => Value::String(other.to_string()),
        }
    }
}
