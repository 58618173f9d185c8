//! Adapts the transport's callback events into an ordered stream.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use fleetlink_shared::{NotifyMessage, ResponseMessage, ServerMessage};
use futures_util::{Stream, StreamExt};

use super::connection::{SharedTransport, TransportEvent};
use super::manager::Connection;

/// A classified inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    Notify(NotifyMessage),
    /// Channel level error reported by the socket.
    Error(String),
    Open,
    Close,
    Response(ResponseMessage),
}

/// Single-consumer stream of [`WireEvent`]s for one connection.
///
/// Events are yielded in arrival order. Closing the channel (explicitly or by
/// dropping it) closes the transport; buffered events are still drained
/// before the stream ends.
pub struct MessageChannel {
    connection: Connection,
    closed: bool,
}

/// Start watching a connection's events.
pub fn watch_messages(connection: Connection) -> MessageChannel {
    MessageChannel {
        connection,
        closed: false,
    }
}

impl MessageChannel {
    pub fn transport(&self) -> &SharedTransport {
        &self.connection.transport
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the channel and the transport behind it. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.connection.events.close();
        self.connection.transport.set_listener(None);
        self.connection.transport.close();
    }
}

impl Stream for MessageChannel {
    type Item = WireEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<WireEvent>> {
        loop {
            let Some(event) = ready!(self.connection.events.poll_next_unpin(cx)) else {
                return Poll::Ready(None);
            };
            let wire = match event {
                TransportEvent::Open => WireEvent::Open,
                TransportEvent::Close => WireEvent::Close,
                TransportEvent::Error(message) => WireEvent::Error(message),
                TransportEvent::Message(text) => match ServerMessage::parse(&text) {
                    Ok(ServerMessage::Notify(notify)) => WireEvent::Notify(notify),
                    Ok(ServerMessage::Response(response)) => WireEvent::Response(response),
                    Err(e) => {
                        crate::log_error!("Dropping unreadable message: {} ({})", e, text);
                        continue;
                    }
                },
            };
            return Poll::Ready(Some(wire));
        }
    }
}

impl Drop for MessageChannel {
    fn drop(&mut self) {
        self.close();
    }
}
