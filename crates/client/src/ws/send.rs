//! Send pipeline: turns request intents into wire requests.

use fleetlink_shared::{Action, ClientError, RequestId, RequestMessage};
use serde_json::Value;

use super::connection::SharedTransport;
use super::correlator::NextActionBuilder;
use super::state::SharedSession;
use crate::bus::{take_action, ActionBus};
use crate::events;
use crate::lock;

/// The only path that performs network sends. Cheap to clone; clones share
/// the transport and session state.
#[derive(Clone)]
pub struct SendPipeline {
    transport: SharedTransport,
    bus: ActionBus,
    session: SharedSession,
}

impl SendPipeline {
    pub fn new(transport: SharedTransport, bus: ActionBus, session: SharedSession) -> Self {
        Self {
            transport,
            bus,
            session,
        }
    }

    pub async fn send(&self, action: Action) {
        self.send_with_next_actions(action, Vec::new()).await
    }

    /// Send `action`, dispatching the actions built by `next_actions` once
    /// its response arrives.
    ///
    /// Cached endpoints that were already fetched on this connection are
    /// skipped without any event. Otherwise `<type>Start` is emitted before
    /// sending, and `<type>Error` if sending fails.
    pub async fn send_with_next_actions(
        &self,
        action: Action,
        next_actions: Vec<NextActionBuilder>,
    ) {
        let Some(endpoint) = action.endpoint() else {
            crate::log_warn!("Ignoring request {} without a model and method", action.r#type);
            return;
        };

        if !self.claim_endpoint(&action, &endpoint) {
            crate::log_debug!("{} already loaded, not fetching again", endpoint);
            return;
        }

        let item = action.item();
        self.bus.dispatch(events::start(&action, item.clone()));

        if let Err(e) = self.send_messages(&action, &endpoint, &next_actions).await {
            crate::log_error!("Failed to send {}: {}", endpoint, e);
            self.bus
                .dispatch(events::request_error(&action, item, e.to_payload()));
        }
    }

    /// Cache check. Explicitly cached endpoints, and `*list` methods that are
    /// not fetching a later page and did not opt out, are fetched at most
    /// once per connection. Check and mark happen under one lock.
    fn claim_endpoint(&self, action: &Action, endpoint: &str) -> bool {
        let Some(meta) = action.meta.as_ref() else {
            return true;
        };
        let method = meta.method.as_deref().unwrap_or_default();
        let cacheable =
            meta.cache || (method.ends_with("list") && !action.has_start() && !meta.nocache);

        !cacheable || lock(&self.session).loaded.mark_loaded(endpoint)
    }

    async fn send_messages(
        &self,
        action: &Action,
        endpoint: &str,
        next_actions: &[NextActionBuilder],
    ) -> Result<(), ClientError> {
        match action.params() {
            Some(Value::Array(items)) => {
                // Each item waits for the notify of the previous one. A notify
                // of the same type from another client also releases the wait.
                let notify_type = events::notify_type(&action.r#type);
                let mut notifications = self.bus.subscribe();
                for item in items {
                    let message = RequestMessage::new(endpoint, Some(item.clone()));
                    let id = self.transport.send(action, message)?;
                    self.register(id, action, next_actions);
                    take_action(&mut notifications, &notify_type)
                        .await
                        .ok_or_else(|| {
                            ClientError::Transport(format!(
                                "Stopped waiting for {} before all items were sent",
                                notify_type
                            ))
                        })?;
                }
            }
            params => {
                let message = RequestMessage::new(endpoint, params.cloned());
                let id = self.transport.send(action, message)?;
                self.register(id, action, next_actions);
            }
        }
        Ok(())
    }

    /// Record correlation state right after the send, before any response
    /// for `id` can be handled.
    fn register(&self, id: RequestId, action: &Action, next_actions: &[NextActionBuilder]) {
        let mut session = lock(&self.session);
        session.correlator.record_next_actions(id, next_actions);
        session.correlator.record_batch(id, action);
        session.correlator.record_file_context(id, action);
    }
}
