//! Transport adapter: one WebSocket connection per chat session.

pub mod frame;
pub mod socket;

use thiserror::Error;

use crate::models::Message;

pub use frame::{decode_inbound, FrameError, OutboundFrame};
pub use socket::SocketTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("Not connected")]
    NotConnected,

    #[error("Send buffer full")]
    Backpressure,

    #[error("Frame encoding failed: {0}")]
    Frame(#[from] FrameError),
}

/// Events posted by the connection's background reader.
#[derive(Debug)]
pub enum TransportEvent {
    /// A frame decoded into a canonical message.
    Message(Message),
    /// A frame that failed to decode and was dropped.
    FrameRejected(String),
    /// The connection reported an error.
    Error(String),
    /// The remote side closed or the stream ended.
    Closed,
}
