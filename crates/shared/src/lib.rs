//! Shared types for the fleetlink WebSocket client: the wire protocol spoken
//! with the fleet API, the action model exchanged with the UI layer, and the
//! error taxonomy.

pub mod action;
pub mod error;
pub mod protocol;

pub use action::*;
pub use error::*;
pub use protocol::*;
