//! Physical socket seam.
//!
//! The transport never talks to a network library directly. It drives
//! [`Socket`] objects created by an injected [`SocketFactory`], and learns what
//! happened to them through [`SocketEvent`]s fed back into
//! [`Transport::handle_event`](crate::Transport::handle_event).

use std::time::Duration;

use tether_core::PhysicalAddress;
use thiserror::Error;

/// Failure reported by a socket when a frame could not be handed off.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SocketError {
    /// The socket has no live connection.
    #[error("socket is not connected")]
    NotConnected,
    /// The socket was closed locally or by the peer.
    #[error("socket is closed")]
    Closed,
    /// Lower-level I/O failure (including a full outbound buffer).
    #[error("socket i/o failure: {0}")]
    Io(String),
}

/// A single physical connection to one address.
///
/// Implementations must report lifecycle changes asynchronously as
/// [`SocketEvent`]s. None of these calls may block.
pub trait Socket: Send {
    /// Start connecting after `delay`. Calling this while a connection is live
    /// or pending is a no-op.
    fn open(&mut self, delay: Duration);

    /// Hand one text frame to the socket.
    fn send(&mut self, text: &str) -> Result<(), SocketError>;

    /// Close the connection. A `Closed` event follows if it was open.
    fn close(&mut self);
}

/// Creates sockets for the connection registry.
pub trait SocketFactory: Send {
    /// Create an unopened socket for `address`.
    fn create(&self, address: &PhysicalAddress) -> Box<dyn Socket>;
}

/// Lifecycle and data events reported by sockets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketEvent {
    /// The connection is open and ready for traffic.
    Opened {
        /// Address that opened.
        address: PhysicalAddress,
    },
    /// The connection closed, or a connect attempt failed.
    Closed {
        /// Address that closed.
        address: PhysicalAddress,
        /// Close reason, when the peer or library supplied one.
        reason: Option<String>,
    },
    /// A transport error. Diagnostic only.
    Error {
        /// Address that failed.
        address: PhysicalAddress,
        /// Error description.
        error: String,
    },
    /// A text frame arrived.
    Message {
        /// Address the frame arrived on.
        address: PhysicalAddress,
        /// Raw frame text.
        text: String,
    },
}

impl SocketEvent {
    /// Address the event refers to.
    pub fn address(&self) -> &PhysicalAddress {
        match self {
            Self::Opened { address }
            | Self::Closed { address, .. }
            | Self::Error { address, .. }
            | Self::Message { address, .. } => address,
        }
    }

    /// Short event name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Opened { .. } => "opened",
            Self::Closed { .. } => "closed",
            Self::Error { .. } => "error",
            Self::Message { .. } => "message",
        }
    }
}
