//! Fleet API WebSocket protocol definitions.
//!
//! Requests carry a `method` of the form `<model>.<verb>` and a client
//! assigned `request_id`. The server answers each request with a response
//! carrying the same id, and pushes unsolicited notify messages whenever a
//! model changes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// Identifier assigned by the transport to every outbound request.
pub type RequestId = u64;

/// Values of the `type` field on wire messages.
pub mod message_type {
    pub const REQUEST: u8 = 0;
    pub const RESPONSE: u8 = 1;
    pub const NOTIFY: u8 = 2;
}

/// Values of the `rtype` field on response messages.
pub mod response_type {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
}

/// A request sent to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestMessage {
    pub method: String,
    #[serde(rename = "type")]
    pub r#type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Filled in by the transport at send time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
}

impl RequestMessage {
    /// Build a request for `endpoint` (`<model>.<verb>`). Null params are
    /// omitted from the serialized message.
    pub fn new(endpoint: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            method: endpoint.into(),
            r#type: message_type::REQUEST,
            params: params.filter(|p| !p.is_null()),
            request_id: None,
        }
    }
}

/// The server's answer to a single request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseMessage {
    pub request_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtype: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Usually a string, which may itself hold JSON. Some handlers send a
    /// structured value directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ResponseMessage {
    /// The error carried by this response, ignoring empty placeholders.
    pub fn error(&self) -> Option<&Value> {
        self.error.as_ref().filter(|e| match e {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        })
    }
}

/// An unsolicited push announcing a model mutation.
///
/// ```json
/// {"type": 2, "name": "config", "action": "update",
///  "data": {"name": "maas_name", "value": "maas-hysteria"}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotifyMessage {
    pub name: String,
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

/// Any message the server can send.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Notify(NotifyMessage),
    Response(ResponseMessage),
}

impl ServerMessage {
    /// Decode a text frame. Anything not tagged as a notify is treated as a
    /// response and must carry a `request_id`.
    pub fn parse(text: &str) -> Result<Self, ClientError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ClientError::Decode(e.to_string()))?;
        let is_notify = value
            .get("type")
            .and_then(Value::as_u64)
            .is_some_and(|t| t == message_type::NOTIFY as u64);

        if is_notify {
            serde_json::from_value(value)
                .map(ServerMessage::Notify)
                .map_err(|e| ClientError::Decode(format!("invalid notify message: {}", e)))
        } else {
            serde_json::from_value(value)
                .map(ServerMessage::Response)
                .map_err(|e| ClientError::Decode(format!("invalid response message: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_missing_params() {
        let msg = RequestMessage::new("machine.list", None);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, json!({"method": "machine.list", "type": 0}));

        let msg = RequestMessage::new("machine.list", Some(Value::Null));
        assert!(msg.params.is_none());
    }

    #[test]
    fn request_serializes_params_and_id() {
        let mut msg = RequestMessage::new("config.update", Some(json!({"name": "ntp_servers"})));
        msg.request_id = Some(4);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({
                "method": "config.update",
                "type": 0,
                "params": {"name": "ntp_servers"},
                "request_id": 4
            })
        );
    }

    #[test]
    fn parses_notify() {
        let text = r#"{"type":2,"name":"config","action":"update","data":{"name":"maas_name","value":"hysteria"}}"#;
        match ServerMessage::parse(text).unwrap() {
            ServerMessage::Notify(n) => {
                assert_eq!(n.name, "config");
                assert_eq!(n.action, "update");
                assert_eq!(n.data["value"], "hysteria");
            }
            other => panic!("expected notify, got {:?}", other),
        }
    }

    #[test]
    fn parses_response_with_result() {
        let text = r#"{"type":1,"request_id":7,"rtype":0,"result":[{"id":1},{"id":2}]}"#;
        match ServerMessage::parse(text).unwrap() {
            ServerMessage::Response(r) => {
                assert_eq!(r.request_id, 7);
                assert_eq!(r.result, Some(json!([{"id": 1}, {"id": 2}])));
                assert!(r.error().is_none());
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn untyped_message_with_request_id_is_a_response() {
        let msg = ServerMessage::parse(r#"{"request_id":9,"error":"not valid json"}"#).unwrap();
        match msg {
            ServerMessage::Response(r) => assert_eq!(r.error(), Some(&json!("not valid json"))),
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn empty_error_is_ignored() {
        let msg: ResponseMessage =
            serde_json::from_value(json!({"request_id": 1, "error": "", "result": 3})).unwrap();
        assert!(msg.error().is_none());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            ServerMessage::parse("not json"),
            Err(ClientError::Decode(_))
        ));
        assert!(matches!(
            ServerMessage::parse(r#"{"type":1,"result":[]}"#),
            Err(ClientError::Decode(_))
        ));
    }
}
