//! Top-level supervisor wiring the connection, the dispatch loop and the
//! send pipeline together.
//!
//! ```text
//!   status/websocketConnect
//!            │
//!            ▼
//!   ┌─────────────────┐   open    ┌──────────────────────────────────────┐
//!   │ create_connection├─────────▶│ race                                 │
//!   └─────────────────┘           │  ├─ serve: Dispatcher::run           │
//!                                 │  │         + request listener        │
//!                                 │  └─ cancel: status/websocketDisconnect│
//!                                 └──────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use futures_util::future::{join, BoxFuture};
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::channel::watch_messages;
use super::connection::SharedTransport;
use super::dispatch::Dispatcher;
use super::handler::MessageHandler;
use super::manager::create_connection;
use super::send::SendPipeline;
use super::state::{SessionState, SharedSession};
use crate::bus::{take_action, ActionBus, ActionStream};
use crate::events;
use crate::file_context::{BlobStore, FileContextStore};
use crate::lock;

/// Lifecycle of one connect request.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorState {
    Idle,
    Connecting,
    Connected,
    Cancelling,
    Failed { reason: String },
}

impl OrchestratorState {
    pub fn is_connected(&self) -> bool {
        matches!(self, OrchestratorState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, OrchestratorState::Connecting)
    }
}

pub struct Orchestrator {
    transport: SharedTransport,
    bus: ActionBus,
    file_context: Arc<dyn BlobStore>,
    handlers: Vec<Arc<dyn MessageHandler>>,
    session: SharedSession,
    state: watch::Sender<OrchestratorState>,
}

impl Orchestrator {
    pub fn new(transport: SharedTransport, bus: ActionBus) -> Self {
        let (state, _) = watch::channel(OrchestratorState::Idle);
        Self {
            transport,
            bus,
            file_context: Arc::new(FileContextStore::new()),
            handlers: Vec::new(),
            session: Arc::new(Mutex::new(SessionState::default())),
            state,
        }
    }

    /// Where results of file context requests are written.
    pub fn with_file_context(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.file_context = store;
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }

    pub fn state(&self) -> watch::Receiver<OrchestratorState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: OrchestratorState) {
        self.state.send_replace(state);
    }

    /// Connect, then serve until a disconnect is requested.
    ///
    /// Only a failure to connect ends this early; it is reported as
    /// `status/websocketError` and not retried here.
    pub async fn run(&self) {
        self.set_state(OrchestratorState::Connecting);
        let connection = match create_connection(self.transport.clone()).await {
            Ok(connection) => connection,
            Err(e) => {
                crate::log_error!("WebSocket setup failed: {}", e);
                self.set_state(OrchestratorState::Failed {
                    reason: e.to_string(),
                });
                self.bus
                    .dispatch(events::websocket_error(Value::String(e.to_string())));
                return;
            }
        };

        // Subscribe before announcing the connection so no request is missed.
        let requests = self.bus.subscribe();
        let mut cancel = self.bus.subscribe();

        self.set_state(OrchestratorState::Connected);
        self.bus.dispatch(events::connected());
        lock(&self.session).loaded.reset();

        let mut channel = watch_messages(connection);
        let dispatcher = Dispatcher::new(
            self.transport.clone(),
            self.bus.clone(),
            self.session.clone(),
            self.file_context.clone(),
        );
        let pipeline = SendPipeline::new(
            self.transport.clone(),
            self.bus.clone(),
            self.session.clone(),
        );

        tokio::select! {
            _ = join(dispatcher.run(&mut channel), self.serve_requests(pipeline, requests)) => {
                crate::log_warn!("Stopped serving without a disconnect request");
            }
            _ = take_action(&mut cancel, events::WEBSOCKET_DISCONNECT) => {
                crate::log_info!("Disconnect requested");
            }
        }

        self.set_state(OrchestratorState::Cancelling);
        channel.close();
        self.bus.dispatch(events::disconnected());
        self.set_state(OrchestratorState::Idle);
    }

    /// Send every request intent seen on `actions` and run matching handlers.
    ///
    /// All sends are driven from this one task; a bulk send waiting for its
    /// notify does not hold up later intents.
    async fn serve_requests(&self, pipeline: SendPipeline, mut actions: ActionStream) {
        let mut in_flight: FuturesUnordered<BoxFuture<'static, ()>> = FuturesUnordered::new();

        loop {
            tokio::select! {
                biased;
                Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
                next = actions.next() => {
                    let Some(action) = next else { break };
                    for handler in self.handlers.iter().filter(|h| h.matches(&action)) {
                        let handler = handler.clone();
                        let pipeline = pipeline.clone();
                        let action = action.clone();
                        in_flight.push(async move { handler.handle(pipeline, action).await }.boxed());
                    }
                    if action.is_request() {
                        let pipeline = pipeline.clone();
                        in_flight.push(async move { pipeline.send(action).await }.boxed());
                    }
                }
            }
        }

        while in_flight.next().await.is_some() {}
    }

    /// Serve connect requests from the bus until it closes. A new connect
    /// request replaces the session started by the previous one.
    pub async fn watch(self: Arc<Self>) {
        let actions = self.bus.subscribe();
        self.supervise(actions).await
    }

    /// Like [`Orchestrator::watch`], but subscribes before returning so a
    /// connect request dispatched right after this call is not missed.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let actions = self.bus.subscribe();
        tokio::spawn(self.supervise(actions))
    }

    async fn supervise(self: Arc<Self>, mut actions: ActionStream) {
        let mut current: Option<JoinHandle<()>> = None;

        while let Some(action) = actions.next().await {
            if action.r#type != events::WEBSOCKET_CONNECT {
                continue;
            }
            if let Some(task) = current.take() {
                task.abort();
                // Wait for the old session to drop its channel before the new
                // one installs a listener.
                let _ = task.await;
            }
            let orchestrator = self.clone();
            current = Some(tokio::spawn(async move { orchestrator.run().await }));
        }

        if let Some(task) = current {
            task.abort();
        }
    }
}
