//! Transport contract for the fleet API WebSocket.
//!
//! A transport owns the physical socket and reconnects on its own. The
//! orchestration layer only talks to it through [`Transport`]: it triggers
//! connects, installs a single event listener (the equivalent of the
//! socket's `onopen`/`onmessage`/`onerror`/`onclose` slots), sends requests
//! and looks up the intent behind a request id.

use std::sync::Arc;

use fleetlink_shared::{Action, ClientError, RequestId, RequestMessage};
use futures_channel::mpsc::UnboundedSender;
use url::Url;

/// Socket ready state, mirroring the WebSocket API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ReadyState {
    pub fn is_open(&self) -> bool {
        matches!(self, ReadyState::Open)
    }

    /// Closed or on its way there; a connect must be triggered.
    pub fn is_closed(&self) -> bool {
        matches!(self, ReadyState::Closed | ReadyState::Closing)
    }
}

/// Raw socket events as reported by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Open,
    Message(String),
    Error(String),
    Close,
}

/// Where the transport delivers its events.
pub type EventListener = UnboundedSender<TransportEvent>;

/// The socket client the orchestration layer drives.
pub trait Transport: Send + Sync {
    fn ready_state(&self) -> ReadyState;

    /// Build the endpoint URL. Fails when connection prerequisites (such as
    /// the CSRF token) are missing.
    fn build_url(&self) -> Result<Url, ClientError>;

    /// Start connecting. The transport keeps retrying on its own until its
    /// reconnect budget runs out, which it reports as `Error` then `Close`.
    fn connect(&self);

    /// Replace the event listener. `None` detaches it.
    fn set_listener(&self, listener: Option<EventListener>);

    /// Send a request on behalf of `intent`, returning the id the response
    /// will carry.
    fn send(&self, intent: &Action, message: RequestMessage) -> Result<RequestId, ClientError>;

    /// The intent a request id was sent for.
    fn get_request(&self, id: RequestId) -> Option<Action>;

    fn close(&self);
}

pub type SharedTransport = Arc<dyn Transport>;

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnect attempts (0 = infinite)
    pub max_attempts: u32,
    /// Initial delay in milliseconds
    pub initial_delay_ms: u32,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u32,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 1.5,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> u32 {
        let delay = self.initial_delay_ms as f32 * self.backoff_multiplier.powi(attempt as i32);
        (delay as u32).min(self.max_delay_ms)
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts == 0 || attempt < self.max_attempts
    }
}

mod connection_native;
pub use connection_native::WebSocketClient;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay_for_attempt(0), 1000);
        assert_eq!(config.delay_for_attempt(1), 1500);
        assert_eq!(config.delay_for_attempt(2), 2250);
        assert_eq!(config.delay_for_attempt(20), 30000);
    }

    #[test]
    fn zero_max_attempts_retries_forever() {
        let config = ReconnectConfig::default();
        assert!(config.allows(10_000));

        let limited = ReconnectConfig {
            max_attempts: 3,
            ..Default::default()
        };
        assert!(limited.allows(2));
        assert!(!limited.allows(3));
    }

    #[test]
    fn ready_state_helpers() {
        assert!(ReadyState::Open.is_open());
        assert!(ReadyState::Closing.is_closed());
        assert!(!ReadyState::Connecting.is_closed());
    }
}
