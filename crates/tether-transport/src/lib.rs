//! # tether-transport
//!
//! Connection lifecycle for tether endpoints: who is connected where, what to
//! do when a connection opens or drops, and what to do with traffic that
//! arrives while it is down.
//!
//! - [`IdentityResolver`]: logical endpoint ⇄ physical address
//! - [`ConnectionRegistry`]: one socket per address
//! - [`ActionRegistry`]: cancellable connect/disconnect callbacks
//! - [`Sustainer`]: bounded-retry reconnection
//! - [`ReplayCache`]: bounded backlog flushed on reconnect
//! - [`Transport`]: owns all of the above and consumes [`SocketEvent`]s
//!
//! Everything here is synchronous and `&mut self`. One task owns the
//! [`Transport`] and feeds it events in order.

#![deny(unsafe_code)]

pub mod actions;
pub mod connection;
pub mod endpoint;
pub mod errors;
pub mod frame;
pub mod identity;
pub mod replay;
pub mod socket;
pub mod sustainer;
pub mod testing;
pub mod transport;

pub use actions::{Action, ActionKind, ActionRegistry, Subscription};
pub use connection::{Connection, ConnectionRegistry, ConnectionState};
pub use endpoint::InboundMessage;
pub use errors::{Result, TransportError};
pub use frame::TransmissionFrame;
pub use identity::IdentityResolver;
pub use replay::{FlushReport, ReplayCache};
pub use socket::{Socket, SocketError, SocketEvent, SocketFactory};
pub use sustainer::{SustainOutcome, Sustainer, SustainerState};
pub use transport::{Delivery, Transmit, Transport};
