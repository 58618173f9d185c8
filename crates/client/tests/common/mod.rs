#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleetlink_client::ws::{EventListener, ReadyState, Transport, TransportEvent};
use fleetlink_client::{Action, ActionStream, ClientError};
use fleetlink_shared::{RequestId, RequestMessage};
use futures_util::{FutureExt, StreamExt};
use serde_json::{json, Value};
use url::Url;

/// Scripted transport. Connecting opens immediately; tests push inbound
/// frames with [`MockTransport::respond`] and friends.
#[derive(Default)]
pub struct MockTransport {
    inner: Mutex<MockState>,
}

struct MockState {
    ready_state: ReadyState,
    listener: Option<EventListener>,
    sent: Vec<RequestMessage>,
    requests: HashMap<RequestId, Action>,
    next_id: RequestId,
    csrf_token: Option<String>,
    fail_sends: bool,
    connects: usize,
    closes: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            ready_state: ReadyState::Closed,
            listener: None,
            sent: Vec::new(),
            requests: HashMap::new(),
            next_id: 0,
            csrf_token: Some("token".to_string()),
            fail_sends: false,
            connects: 0,
            closes: 0,
        }
    }
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A transport that is already open.
    pub fn open() -> Arc<Self> {
        let transport = Self::new();
        transport.state().ready_state = ReadyState::Open;
        transport
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap()
    }

    pub fn without_token(self: Arc<Self>) -> Arc<Self> {
        self.state().csrf_token = None;
        self
    }

    pub fn fail_sends(&self) {
        self.state().fail_sends = true;
    }

    pub fn emit(&self, event: TransportEvent) {
        let listener = self.state().listener.clone();
        if let Some(listener) = listener {
            let _ = listener.unbounded_send(event);
        }
    }

    pub fn push(&self, message: Value) {
        self.emit(TransportEvent::Message(message.to_string()));
    }

    pub fn respond(&self, request_id: RequestId, result: Value) {
        self.push(json!({"type": 1, "request_id": request_id, "rtype": 0, "result": result}));
    }

    pub fn respond_error(&self, request_id: RequestId, error: Value) {
        self.push(json!({"type": 1, "request_id": request_id, "rtype": 1, "error": error}));
    }

    pub fn notify(&self, name: &str, action: &str, data: Value) {
        self.push(json!({"type": 2, "name": name, "action": action, "data": data}));
    }

    pub fn sent(&self) -> Vec<RequestMessage> {
        self.state().sent.clone()
    }

    pub fn last_request_id(&self) -> Option<RequestId> {
        self.state().sent.last().and_then(|m| m.request_id)
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }

    pub fn has_listener(&self) -> bool {
        self.state().listener.is_some()
    }
}

impl Transport for MockTransport {
    fn ready_state(&self) -> ReadyState {
        self.state().ready_state
    }

    fn build_url(&self) -> Result<Url, ClientError> {
        match &self.state().csrf_token {
            Some(token) => Ok(Url::parse(&format!("ws://fleet.test/ws?csrftoken={}", token))
                .expect("static url")),
            None => Err(ClientError::Configuration("No csrftoken exists.".into())),
        }
    }

    fn connect(&self) {
        let listener = {
            let mut state = self.state();
            state.connects += 1;
            state.ready_state = ReadyState::Open;
            state.listener.clone()
        };
        if let Some(listener) = listener {
            let _ = listener.unbounded_send(TransportEvent::Open);
        }
    }

    fn set_listener(&self, listener: Option<EventListener>) {
        self.state().listener = listener;
    }

    fn send(&self, intent: &Action, mut message: RequestMessage) -> Result<RequestId, ClientError> {
        let mut state = self.state();
        if state.fail_sends {
            return Err(ClientError::Transport("WebSocket is not open".into()));
        }
        let id = state.next_id;
        state.next_id += 1;
        message.request_id = Some(id);
        state.sent.push(message);
        state.requests.insert(id, intent.clone());
        Ok(id)
    }

    fn get_request(&self, id: RequestId) -> Option<Action> {
        self.state().requests.get(&id).cloned()
    }

    fn close(&self) {
        let mut state = self.state();
        state.closes += 1;
        state.ready_state = ReadyState::Closed;
    }
}

pub fn action(value: Value) -> Action {
    serde_json::from_value(value).expect("valid action")
}

/// Wait for the next action of `action_type`, failing after two seconds.
pub async fn expect_action(stream: &mut ActionStream, action_type: &str) -> Action {
    tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(action) = stream.next().await {
            if action.r#type == action_type {
                return action;
            }
        }
        panic!("action stream ended before {}", action_type);
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", action_type))
}

/// Everything already queued on `stream`, without waiting.
pub fn drain(stream: &mut ActionStream) -> Vec<Action> {
    let mut actions = Vec::new();
    while let Some(Some(action)) = stream.next().now_or_never() {
        actions.push(action);
    }
    actions
}

pub fn types(actions: &[Action]) -> Vec<&str> {
    actions.iter().map(|a| a.r#type.as_str()).collect()
}

/// Poll `condition` until it holds, failing after two seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}
