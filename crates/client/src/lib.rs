//! Fleetlink Client - WebSocket client for the fleet management API
//!
//! This crate contains the request/response orchestration layer used by the
//! administration console: a reconnecting WebSocket transport, the dispatch
//! loop that turns server messages into UI events, and the send pipeline that
//! turns UI request intents into wire requests.

use std::sync::{Mutex, MutexGuard};

pub mod bus;
pub mod config;
pub mod events;
pub mod file_context;
pub mod logging;
pub mod ws;

pub use bus::{take_action, ActionBus, ActionStream};
pub use config::ClientConfig;
pub use file_context::{BlobStore, FileContextStore};
pub use fleetlink_shared::{Action, ActionMeta, ClientError};
pub use ws::{
    MessageHandler, NextActionBuilder, Orchestrator, OrchestratorState, SendPipeline, Transport,
    WebSocketClient,
};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
