//! Dispatch loop: turns inbound wire events into UI events.

use std::sync::Arc;

use fleetlink_shared::{Action, ClientError, ResponseMessage, RESPONSE_PARSE_ERROR};
use futures_util::StreamExt;
use serde_json::Value;

use super::channel::{MessageChannel, WireEvent};
use super::connection::SharedTransport;
use super::correlator::BatchOutcome;
use super::state::SharedSession;
use crate::bus::ActionBus;
use crate::events;
use crate::file_context::BlobStore;
use crate::lock;

/// Handles inbound events for one connection.
#[derive(Clone)]
pub struct Dispatcher {
    transport: SharedTransport,
    bus: ActionBus,
    session: SharedSession,
    file_context: Arc<dyn BlobStore>,
}

impl Dispatcher {
    pub fn new(
        transport: SharedTransport,
        bus: ActionBus,
        session: SharedSession,
        file_context: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            transport,
            bus,
            session,
            file_context,
        }
    }

    /// Consume the channel until it ends. Events are handled one at a time,
    /// so the handling of one response never interleaves with another.
    pub async fn run(&self, channel: &mut MessageChannel) {
        while let Some(event) = channel.next().await {
            self.handle_event(event);
        }
        crate::log_info!("Message channel ended");
    }

    pub fn handle_event(&self, event: WireEvent) {
        match event {
            WireEvent::Notify(message) => self.bus.dispatch(events::notify(&message)),
            WireEvent::Error(message) => {
                crate::log_warn!("WebSocket error: {}", message);
                self.bus
                    .dispatch(events::websocket_error(Value::String(message)));
            }
            WireEvent::Close => self.bus.dispatch(events::disconnected()),
            WireEvent::Open => {
                self.bus.dispatch(events::connected());
                lock(&self.session).loaded.reset();
            }
            WireEvent::Response(response) => self.handle_response(response),
        }
    }

    /// Resolve a response against the request that caused it.
    ///
    /// Emits `<type>Error` or `<type>Success`; on success the batch and then
    /// the follow-up actions are resolved, in that order. The blob store and
    /// the follow-up builders run after the session lock is released.
    pub fn handle_response(&self, response: ResponseMessage) {
        let id = response.request_id;
        let Some(intent) = self.transport.get_request(id) else {
            crate::log_warn!("Received response for unknown request {}", id);
            lock(&self.session).correlator.forget(id);
            return;
        };
        let item = intent.item();
        let error = response.error();
        let raw = response.result.as_ref().unwrap_or(&Value::Null);

        let file_context_key = lock(&self.session).correlator.take_file_context_key(id);
        if let (Some(key), Some(result), None) = (&file_context_key, &response.result, error) {
            self.file_context.add(key, result.clone());
        }

        let outcome = match error {
            Some(detail) => Err(ClientError::remote(detail)),
            None if file_context_key.is_some() => Ok(Value::Null),
            None => decode_result(&intent, response.result.as_ref()),
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                lock(&self.session).correlator.forget(id);
                crate::log_debug!("Request {} ({}) failed: {}", id, intent.r#type, e);
                self.bus
                    .dispatch(events::request_error(&intent, item, e.to_payload()));
                return;
            }
        };

        let (batch, builders) = {
            let mut session = lock(&self.session);
            let batch = session.correlator.resolve_batch(id, raw);
            (batch, session.correlator.take_next_actions(id))
        };

        self.bus.dispatch(events::success(&intent, item, result));
        match batch {
            Some(BatchOutcome::Continue(next)) => self.bus.dispatch(next),
            Some(BatchOutcome::Complete { intent_type }) => {
                self.bus.dispatch(events::complete(&intent_type))
            }
            None => {}
        }
        for build in builders {
            self.bus.dispatch(build(raw));
        }
    }
}

/// The result as delivered to the UI, decoding JSON-encoded strings for
/// intents that ask for it. Scalars and null are already decoded.
fn decode_result(intent: &Action, result: Option<&Value>) -> Result<Value, ClientError> {
    let result = result.cloned().unwrap_or(Value::Null);
    let json_response = intent.meta.as_ref().is_some_and(|m| m.json_response);
    if !json_response {
        return Ok(result);
    }
    match result {
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|_| ClientError::Decode(RESPONSE_PARSE_ERROR.to_string())),
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(result),
        Value::Array(_) | Value::Object(_) => {
            Err(ClientError::Decode(RESPONSE_PARSE_ERROR.to_string()))
        }
    }
}
