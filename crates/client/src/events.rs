//! Action types and builders for the events the client emits.

use fleetlink_shared::{Action, ActionMeta, NotifyMessage};
use serde_json::Value;

/// Requests a (re)connect.
pub const WEBSOCKET_CONNECT: &str = "status/websocketConnect";
/// Requests a disconnect.
pub const WEBSOCKET_DISCONNECT: &str = "status/websocketDisconnect";
pub const WEBSOCKET_CONNECTED: &str = "status/websocketConnected";
pub const WEBSOCKET_DISCONNECTED: &str = "status/websocketDisconnected";
pub const WEBSOCKET_ERROR: &str = "status/websocketError";

pub const START: &str = "Start";
pub const SUCCESS: &str = "Success";
pub const ERROR: &str = "Error";
pub const COMPLETE: &str = "Complete";
pub const NOTIFY: &str = "Notify";

pub fn connect() -> Action {
    Action::new(WEBSOCKET_CONNECT)
}

pub fn disconnect() -> Action {
    Action::new(WEBSOCKET_DISCONNECT)
}

pub fn connected() -> Action {
    Action::new(WEBSOCKET_CONNECTED)
}

pub fn disconnected() -> Action {
    Action::new(WEBSOCKET_DISCONNECTED)
}

pub fn websocket_error(payload: Value) -> Action {
    Action {
        error: true,
        ..Action::new(WEBSOCKET_ERROR).with_payload(payload)
    }
}

/// Type of the notify event matching an intent type, e.g.
/// `config/update` -> `config/updateNotify`.
pub fn notify_type(intent_type: &str) -> String {
    format!("{}{}", intent_type, NOTIFY)
}

/// `<name>/<action>Notify` carrying the pushed data.
pub fn notify(message: &NotifyMessage) -> Action {
    Action::new(format!("{}/{}{}", message.name, message.action, NOTIFY))
        .with_payload(message.data.clone())
}

fn with_item(r#type: String, item: Option<Value>) -> Action {
    Action::new(r#type).with_meta(ActionMeta {
        item,
        ..Default::default()
    })
}

pub fn start(intent: &Action, item: Option<Value>) -> Action {
    with_item(intent.suffixed(START), item)
}

pub fn success(intent: &Action, item: Option<Value>, result: Value) -> Action {
    with_item(intent.suffixed(SUCCESS), item).with_payload(result)
}

pub fn request_error(intent: &Action, item: Option<Value>, payload: Value) -> Action {
    Action {
        error: true,
        ..with_item(intent.suffixed(ERROR), item).with_payload(payload)
    }
}

pub fn complete(intent_type: &str) -> Action {
    Action::new(format!("{}{}", intent_type, COMPLETE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn notify_event_type_is_name_and_action() {
        let msg = NotifyMessage {
            name: "config".into(),
            action: "update".into(),
            data: json!({"name": "maas_name", "value": "hysteria"}),
        };
        let event = notify(&msg);
        assert_eq!(event.r#type, "config/updateNotify");
        assert_eq!(event.r#type, notify_type("config/update"));
        assert_eq!(event.payload, Some(msg.data));
    }

    #[test]
    fn error_events_are_flagged() {
        let intent = Action::request("machine/fetch", "machine", "list");
        let event = request_error(&intent, Some(json!({"limit": 2})), json!("boom"));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "machine/fetchError",
                "meta": {"item": {"limit": 2}},
                "payload": "boom",
                "error": true
            })
        );
        assert!(websocket_error(json!("down")).error);
    }

    #[test]
    fn success_keeps_null_payload() {
        let intent = Action::request("script/get", "script", "get_script");
        let event = success(&intent, None, Value::Null);
        assert_eq!(event.r#type, "script/getSuccess");
        assert_eq!(event.payload, Some(Value::Null));
    }
}
