//! WebSocket request/response orchestration for the fleet API.
//!
//! Many logical RPCs share one persistent socket. This module:
//! - brings the socket up and reacts to its lifecycle events
//! - correlates responses with the intents that caused them
//! - continues paginated list fetches automatically
//! - fetches cacheable list endpoints at most once per connection
//! - serializes bulk config updates behind server notifications
//!
//! # Architecture
//!
//! ```text
//!  UI actions ──▶ ActionBus ──▶ SendPipeline ──▶ Transport ──▶ network
//!                    ▲                              │
//!                    │                              ▼
//!                    └──── Dispatcher ◀──── MessageChannel
//! ```
//!
//! Both halves share one [`SessionState`]: the set of loaded endpoints and
//! the [`RequestCorrelator`].
//!
//! # Usage
//!
//! ```rust,ignore
//! let bus = ActionBus::new();
//! let client = Arc::new(WebSocketClient::new(ClientConfig::from_env()));
//! let orchestrator = Arc::new(Orchestrator::new(client, bus.clone()));
//! orchestrator.spawn();
//!
//! bus.dispatch(events::connect());
//! bus.dispatch(
//!     Action::request("machine/fetch", "machine", "list")
//!         .with_params(json!({"limit": 50})),
//! );
//! ```

mod channel;
mod connection;
mod correlator;
mod dispatch;
mod handler;
mod manager;
mod orchestrator;
mod send;
mod state;

pub use channel::{watch_messages, MessageChannel, WireEvent};
pub use connection::{
    EventListener, ReadyState, ReconnectConfig, SharedTransport, Transport, TransportEvent,
    WebSocketClient,
};
pub use correlator::{BatchOutcome, NextActionBuilder, RequestCorrelator};
pub use dispatch::Dispatcher;
pub use handler::MessageHandler;
pub use manager::{create_connection, Connection};
pub use orchestrator::{Orchestrator, OrchestratorState};
pub use send::SendPipeline;
pub use state::{LoadedEndpoints, SessionState, SharedSession};
