//! Connection management: bringing the transport to the open state.

use fleetlink_shared::ClientError;
use futures_channel::mpsc::{unbounded, UnboundedReceiver};
use futures_util::StreamExt;

use super::connection::{SharedTransport, TransportEvent};

/// An open transport together with the events it has produced since the
/// listener was installed.
pub struct Connection {
    pub(crate) transport: SharedTransport,
    pub(crate) events: UnboundedReceiver<TransportEvent>,
}

impl Connection {
    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }
}

/// Wait for the transport to be open, triggering a connect if needed.
///
/// Resolves immediately when the socket is already open. Otherwise the
/// connection prerequisites are checked up front and a configuration error
/// is returned right away. Once a connect is underway, failed attempts are
/// left to the transport to retry; only a `Close` before `Open`, which the
/// transport sends when it gives up, fails the call with the last error seen.
pub async fn create_connection(transport: SharedTransport) -> Result<Connection, ClientError> {
    // Install the listener before connecting so the open event cannot be missed.
    let (listener, mut events) = unbounded();
    transport.set_listener(Some(listener));

    let ready_state = transport.ready_state();
    if ready_state.is_open() {
        return Ok(Connection { transport, events });
    }

    if ready_state.is_closed() {
        if let Err(e) = transport.build_url() {
            transport.set_listener(None);
            return Err(e);
        }
        crate::log_info!("Connecting to the fleet API");
        transport.connect();
    }

    let mut last_error = None;
    while let Some(event) = events.next().await {
        match event {
            TransportEvent::Open => return Ok(Connection { transport, events }),
            TransportEvent::Error(reason) => {
                crate::log_debug!("Connect attempt failed: {}", reason);
                last_error = Some(reason);
            }
            TransportEvent::Close => {
                crate::log_warn!("Transport closed before opening");
                break;
            }
            TransportEvent::Message(_) => {
                crate::log_debug!("Ignoring message while connecting");
            }
        }
    }

    transport.set_listener(None);
    Err(ClientError::Transport(last_error.unwrap_or_else(|| {
        "Transport closed before opening".to_string()
    })))
}
