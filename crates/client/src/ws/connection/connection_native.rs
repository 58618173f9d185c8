//! Native WebSocket transport using tokio-tungstenite.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use fleetlink_shared::{Action, ClientError, RequestId, RequestMessage};
use futures_channel::mpsc::{unbounded, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::{EventListener, ReadyState, Transport, TransportEvent};
use crate::config::ClientConfig;
use crate::lock;

/// Reconnecting WebSocket client for the fleet API.
///
/// Request ids start at 0 and increase by one per send. The intent behind
/// every id is kept in a ledger so responses can be matched to the action
/// that caused them.
pub struct WebSocketClient {
    config: ClientConfig,
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
}

struct State {
    ready_state: ReadyState,
    listener: Option<EventListener>,
    /// Writer queue of the current socket, present while open.
    outgoing: Option<UnboundedSender<String>>,
    requests: HashMap<RequestId, Action>,
    next_id: RequestId,
    task: Option<JoinHandle<()>>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            ready_state: ReadyState::Closed,
            listener: None,
            outgoing: None,
            requests: HashMap::new(),
            next_id: 0,
            task: None,
        }
    }
}

impl Shared {
    fn emit(&self, event: TransportEvent) {
        let listener = lock(&self.state).listener.clone();
        if let Some(listener) = listener {
            // A closed listener just means nobody is watching right now.
            let _ = listener.unbounded_send(event);
        }
    }

    fn set_ready_state(&self, ready_state: ReadyState) {
        lock(&self.state).ready_state = ready_state;
    }

    fn opened(&self, outgoing: UnboundedSender<String>) {
        let mut state = lock(&self.state);
        state.ready_state = ReadyState::Open;
        state.outgoing = Some(outgoing);
    }

    fn closed(&self) {
        let mut state = lock(&self.state);
        state.ready_state = ReadyState::Closed;
        state.outgoing = None;
    }
}

impl WebSocketClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Number of requests sent through this client.
    pub fn sent_count(&self) -> usize {
        lock(&self.shared.state).requests.len()
    }
}

impl Transport for WebSocketClient {
    fn ready_state(&self) -> ReadyState {
        lock(&self.shared.state).ready_state
    }

    fn build_url(&self) -> Result<Url, ClientError> {
        self.config.build_url()
    }

    /// Spawns the connection loop; must be called within a tokio runtime.
    fn connect(&self) {
        let mut state = lock(&self.shared.state);
        if state.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        state.ready_state = ReadyState::Connecting;
        state.task = Some(tokio::spawn(connection_loop(
            self.config.clone(),
            self.shared.clone(),
        )));
    }

    fn set_listener(&self, listener: Option<EventListener>) {
        lock(&self.shared.state).listener = listener;
    }

    fn send(&self, intent: &Action, mut message: RequestMessage) -> Result<RequestId, ClientError> {
        let mut state = lock(&self.shared.state);
        let outgoing = match (&state.outgoing, state.ready_state) {
            (Some(outgoing), ReadyState::Open) => outgoing.clone(),
            _ => {
                return Err(ClientError::Transport(
                    "WebSocket is not open".to_string(),
                ))
            }
        };

        let id = state.next_id;
        message.request_id = Some(id);
        let json =
            serde_json::to_string(&message).map_err(|e| ClientError::Serialize(e.to_string()))?;
        outgoing
            .unbounded_send(json)
            .map_err(|e| ClientError::Transport(format!("Failed to send: {}", e)))?;

        state.requests.insert(id, intent.clone());
        state.next_id += 1;
        crate::log_debug!("Sent request {} ({})", id, message.method);
        Ok(id)
    }

    fn get_request(&self, id: RequestId) -> Option<Action> {
        lock(&self.shared.state).requests.get(&id).cloned()
    }

    fn close(&self) {
        let mut state = lock(&self.shared.state);
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.ready_state = ReadyState::Closed;
        state.outgoing = None;
    }
}

impl Drop for WebSocketClient {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.shared.state).task.take() {
            task.abort();
        }
    }
}

/// Connect, pump frames until the socket drops, then back off and retry.
async fn connection_loop(config: ClientConfig, shared: Arc<Shared>) {
    let mut attempt = 0u32;

    loop {
        let url = match config.build_url() {
            Ok(url) => url,
            Err(e) => {
                // Configuration errors are final.
                crate::log_error!("Cannot build WebSocket URL: {}", e);
                shared.set_ready_state(ReadyState::Closed);
                shared.emit(TransportEvent::Error(e.to_string()));
                return;
            }
        };

        shared.set_ready_state(ReadyState::Connecting);

        match connect_async(url.as_str()).await {
            Ok((ws_stream, _response)) => {
                attempt = 0;
                crate::log_info!("WebSocket connected to {}", config.ws_url);

                let (mut write, mut read) = ws_stream.split();
                let (out_tx, mut out_rx) = unbounded::<String>();
                shared.opened(out_tx);
                shared.emit(TransportEvent::Open);

                let writer = async {
                    while let Some(json) = out_rx.next().await {
                        if let Err(e) = write.send(Message::Text(json.into())).await {
                            crate::log_error!("Send failed: {}", e);
                            break;
                        }
                    }
                };

                let reader = async {
                    while let Some(msg_result) = read.next().await {
                        match msg_result {
                            Ok(Message::Text(text)) => {
                                shared.emit(TransportEvent::Message(text.as_str().to_owned()));
                            }
                            Ok(Message::Close(_)) => {
                                crate::log_info!(
                                    "WebSocket to {} received close frame",
                                    config.ws_url
                                );
                                break;
                            }
                            Ok(_) => {
                                // Pings are answered by tungstenite; binary frames are not used.
                            }
                            Err(e) => {
                                crate::log_error!("WebSocket read error: {}", e);
                                shared.emit(TransportEvent::Error(e.to_string()));
                                break;
                            }
                        }
                    }
                };

                tokio::select! {
                    _ = writer => {}
                    _ = reader => {}
                }

                crate::log_info!("WebSocket to {} closed", config.ws_url);
                shared.closed();
                shared.emit(TransportEvent::Close);
            }
            Err(e) => {
                crate::log_error!("WebSocket error for {}: {}", config.ws_url, e);
                shared.set_ready_state(ReadyState::Closed);
                shared.emit(TransportEvent::Error(e.to_string()));
            }
        }

        if !config.reconnect.allows(attempt) {
            let reason = format!(
                "Max reconnect attempts ({}) exceeded",
                config.reconnect.max_attempts
            );
            crate::log_error!("{} for {}", reason, config.ws_url);
            shared.closed();
            // Close after the error tells watchers the transport gave up.
            shared.emit(TransportEvent::Error(reason));
            shared.emit(TransportEvent::Close);
            return;
        }

        let delay = config.reconnect.delay_for_attempt(attempt);
        crate::log_info!(
            "Reconnecting to {} in {}ms (attempt {})",
            config.ws_url,
            delay,
            attempt + 1
        );
        tokio::time::sleep(tokio::time::Duration::from_millis(delay as u64)).await;
        attempt += 1;
    }
}
