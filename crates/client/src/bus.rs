//! Action bus shared by the UI layer and the WebSocket client.
//!
//! Everything that would go through the UI store flows over the bus: request
//! intents from the UI, lifecycle events from the client, and follow-up
//! intents the client issues on its own (next batch pages, next actions).
//! Each subscriber sees every action dispatched after it subscribed, in
//! dispatch order.

use std::sync::{Arc, Mutex};

use fleetlink_shared::Action;
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;

use crate::lock;

#[derive(Clone, Default)]
pub struct ActionBus {
    subscribers: Arc<Mutex<Vec<UnboundedSender<Action>>>>,
}

/// Stream of actions seen by one subscriber.
pub type ActionStream = UnboundedReceiver<Action>;

impl ActionBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `action` to every live subscriber. Subscribers whose stream
    /// was dropped are pruned.
    pub fn dispatch(&self, action: Action) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| tx.unbounded_send(action.clone()).is_ok());
    }

    pub fn subscribe(&self) -> ActionStream {
        let (tx, rx) = unbounded();
        lock(&self.subscribers).push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

/// Wait until an action of type `action_type` shows up on `stream`.
///
/// Returns `None` if the stream ends first.
pub async fn take_action(stream: &mut ActionStream, action_type: &str) -> Option<Action> {
    while let Some(action) = stream.next().await {
        if action.r#type == action_type {
            return Some(action);
        }
    }
    None
}
