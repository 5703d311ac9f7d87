//! Connection registry: one socket per physical address.
//!
//! ```text
//! (absent) ──initialize──▶ Initialized ──opened──▶ Open ──closed──▶ Closed
//!                                                   ▲                  │
//!                                                   └─────opened───────┘
//! ```
//!
//! The registry never transitions on its own. State changes only when the
//! transport reports a socket event through [`ConnectionRegistry::mark_open`]
//! or [`ConnectionRegistry::mark_closed`]. Connections are destroyed only by
//! [`ConnectionRegistry::remove`].

use std::collections::HashMap;
use std::time::Duration;

use tether_core::PhysicalAddress;
use tracing::{debug, trace};

use crate::errors::{Result, TransportError};
use crate::socket::{Socket, SocketFactory};

/// Lifecycle state of a registered connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, never opened.
    Initialized,
    /// Open and able to carry traffic.
    Open,
    /// Closed by the peer, by an error, or locally.
    Closed,
}

/// A registered connection.
pub struct Connection {
    address: PhysicalAddress,
    state: ConnectionState,
    socket: Box<dyn Socket>,
    terminating: bool,
}

impl Connection {
    /// Address this connection serves.
    pub fn address(&self) -> &PhysicalAddress {
        &self.address
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the owning endpoint is being torn down.
    pub fn is_terminating(&self) -> bool {
        self.terminating
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("state", &self.state)
            .field("terminating", &self.terminating)
            .finish_non_exhaustive()
    }
}

/// Owns every [`Connection`], keyed by physical address.
pub struct ConnectionRegistry {
    factory: Box<dyn SocketFactory>,
    connections: HashMap<PhysicalAddress, Connection>,
}

impl ConnectionRegistry {
    /// Create an empty registry that builds sockets with `factory`.
    pub fn new(factory: Box<dyn SocketFactory>) -> Self {
        Self {
            factory,
            connections: HashMap::new(),
        }
    }

    /// Register a connection for `address`.
    ///
    /// Returns `false` if one already existed, in which case nothing changes.
    pub fn initialize(&mut self, address: &PhysicalAddress) -> bool {
        if self.connections.contains_key(address) {
            trace!(%address, "connection already initialized");
            return false;
        }
        let socket = self.factory.create(address);
        let _ = self.connections.insert(
            address.clone(),
            Connection {
                address: address.clone(),
                state: ConnectionState::Initialized,
                socket,
                terminating: false,
            },
        );
        debug!(%address, "connection initialized");
        true
    }

    /// Ask the socket to connect after `delay`.
    pub fn establish(&mut self, address: &PhysicalAddress, delay: Duration) -> Result<()> {
        let connection = self.get_mut(address)?;
        debug!(%address, delay_ms = delay.as_millis(), "establishing connection");
        connection.socket.open(delay);
        Ok(())
    }

    /// Send a frame if the connection is open.
    ///
    /// `Ok(false)` means the frame was not handed off: the connection is not
    /// open, or the socket refused it. The caller decides whether to defer it.
    pub fn send(&mut self, address: &PhysicalAddress, text: &str) -> Result<bool> {
        let connection = self.get_mut(address)?;
        if connection.state != ConnectionState::Open {
            trace!(%address, state = ?connection.state, "send skipped, connection not open");
            return Ok(false);
        }
        match connection.socket.send(text) {
            Ok(()) => Ok(true),
            Err(error) => {
                debug!(%address, %error, "socket refused frame");
                Ok(false)
            }
        }
    }

    /// Close the socket. The state changes when the close event arrives.
    pub fn close(&mut self, address: &PhysicalAddress) -> Result<()> {
        let connection = self.get_mut(address)?;
        debug!(%address, "closing connection");
        connection.socket.close();
        Ok(())
    }

    /// Whether `address` has an open connection. Unknown addresses are not open.
    pub fn is_open(&self, address: &PhysicalAddress) -> bool {
        self.connections
            .get(address)
            .is_some_and(|c| c.state == ConnectionState::Open)
    }

    /// Lifecycle state, or `None` when the address is not registered.
    pub fn state(&self, address: &PhysicalAddress) -> Option<ConnectionState> {
        self.connections.get(address).map(Connection::state)
    }

    /// Whether `address` has a registered connection.
    pub fn contains(&self, address: &PhysicalAddress) -> bool {
        self.connections.contains_key(address)
    }

    /// Record a successful open.
    pub fn mark_open(&mut self, address: &PhysicalAddress) -> Result<()> {
        self.get_mut(address)?.state = ConnectionState::Open;
        Ok(())
    }

    /// Record a close.
    pub fn mark_closed(&mut self, address: &PhysicalAddress) -> Result<()> {
        self.get_mut(address)?.state = ConnectionState::Closed;
        Ok(())
    }

    /// Flag the connection for teardown on its next close.
    pub fn mark_terminating(&mut self, address: &PhysicalAddress) -> Result<()> {
        self.get_mut(address)?.terminating = true;
        Ok(())
    }

    /// Clear the teardown flag. Returns whether it was set.
    pub fn unmark_terminating(&mut self, address: &PhysicalAddress) -> bool {
        self.connections
            .get_mut(address)
            .is_some_and(|c| std::mem::replace(&mut c.terminating, false))
    }

    /// Whether the connection is flagged for teardown.
    pub fn is_terminating(&self, address: &PhysicalAddress) -> bool {
        self.connections
            .get(address)
            .is_some_and(Connection::is_terminating)
    }

    /// Destroy the connection for `address`.
    pub fn remove(&mut self, address: &PhysicalAddress) -> Option<Connection> {
        let removed = self.connections.remove(address);
        if removed.is_some() {
            debug!(%address, "connection removed");
        }
        removed
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn get_mut(&mut self, address: &PhysicalAddress) -> Result<&mut Connection> {
        self.connections
            .get_mut(address)
            .ok_or_else(|| TransportError::UnknownAddress {
                address: address.clone(),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSocketFactory;
    use assert_matches::assert_matches;

    fn registry() -> (ConnectionRegistry, MockSocketFactory, PhysicalAddress) {
        let factory = MockSocketFactory::new();
        let registry = ConnectionRegistry::new(Box::new(factory.clone()));
        (registry, factory, PhysicalAddress::from("ws://localhost/api"))
    }

    // ── initialize ──────────────────────────────────────────────────

    #[test]
    fn initialize_creates_connection() {
        let (mut reg, factory, addr) = registry();
        assert!(reg.initialize(&addr));
        assert_eq!(reg.state(&addr), Some(ConnectionState::Initialized));
        assert_eq!(factory.created(&addr), 1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn initialize_twice_is_noop() {
        let (mut reg, factory, addr) = registry();
        assert!(reg.initialize(&addr));
        reg.mark_open(&addr).unwrap();
        assert!(!reg.initialize(&addr));
        assert_eq!(factory.created(&addr), 1);
        assert_eq!(reg.state(&addr), Some(ConnectionState::Open));
    }

    // ── uninitialized addresses ─────────────────────────────────────

    #[test]
    fn operations_on_unknown_address_fail_fast() {
        let (mut reg, _factory, addr) = registry();
        assert_matches!(
            reg.send(&addr, "x"),
            Err(TransportError::UnknownAddress { .. })
        );
        assert_matches!(
            reg.establish(&addr, Duration::ZERO),
            Err(TransportError::UnknownAddress { .. })
        );
        assert_matches!(reg.close(&addr), Err(TransportError::UnknownAddress { .. }));
        assert_matches!(
            reg.mark_open(&addr),
            Err(TransportError::UnknownAddress { .. })
        );
        assert_matches!(
            reg.mark_closed(&addr),
            Err(TransportError::UnknownAddress { .. })
        );
    }

    #[test]
    fn is_open_on_unknown_address_is_false() {
        let (reg, _factory, addr) = registry();
        assert!(!reg.is_open(&addr));
        assert!(reg.state(&addr).is_none());
    }

    // ── send ────────────────────────────────────────────────────────

    #[test]
    fn send_before_open_does_not_touch_socket() {
        let (mut reg, factory, addr) = registry();
        let _ = reg.initialize(&addr);
        assert!(!reg.send(&addr, "early").unwrap());
        assert!(factory.sent(&addr).is_empty());
    }

    #[test]
    fn send_when_open_hands_off() {
        let (mut reg, factory, addr) = registry();
        let _ = reg.initialize(&addr);
        reg.mark_open(&addr).unwrap();
        assert!(reg.send(&addr, "hello").unwrap());
        assert_eq!(factory.sent(&addr), vec!["hello".to_owned()]);
    }

    #[test]
    fn send_after_close_returns_false() {
        let (mut reg, factory, addr) = registry();
        let _ = reg.initialize(&addr);
        reg.mark_open(&addr).unwrap();
        reg.mark_closed(&addr).unwrap();
        assert!(!reg.send(&addr, "late").unwrap());
        assert!(factory.sent(&addr).is_empty());
    }

    #[test]
    fn socket_failure_reads_as_unsent() {
        let (mut reg, factory, addr) = registry();
        let _ = reg.initialize(&addr);
        reg.mark_open(&addr).unwrap();
        factory.fail_sends(true);
        assert!(!reg.send(&addr, "lost").unwrap());
    }

    // ── lifecycle ───────────────────────────────────────────────────

    #[test]
    fn state_follows_marks() {
        let (mut reg, _factory, addr) = registry();
        let _ = reg.initialize(&addr);
        reg.mark_open(&addr).unwrap();
        assert!(reg.is_open(&addr));
        reg.mark_closed(&addr).unwrap();
        assert!(!reg.is_open(&addr));
        assert_eq!(reg.state(&addr), Some(ConnectionState::Closed));
        reg.mark_open(&addr).unwrap();
        assert!(reg.is_open(&addr));
    }

    #[test]
    fn establish_and_close_reach_socket() {
        let (mut reg, factory, addr) = registry();
        let _ = reg.initialize(&addr);
        reg.establish(&addr, Duration::from_secs(2)).unwrap();
        reg.close(&addr).unwrap();
        assert_eq!(factory.opens(&addr), vec![Duration::from_secs(2)]);
        assert_eq!(factory.closes(&addr), 1);
        // close alone does not change state
        assert_eq!(reg.state(&addr), Some(ConnectionState::Initialized));
    }

    #[test]
    fn terminating_flag_and_remove() {
        let (mut reg, _factory, addr) = registry();
        let _ = reg.initialize(&addr);
        assert!(!reg.is_terminating(&addr));
        reg.mark_terminating(&addr).unwrap();
        assert!(reg.is_terminating(&addr));
        assert!(reg.unmark_terminating(&addr));
        assert!(!reg.unmark_terminating(&addr));
        reg.mark_terminating(&addr).unwrap();

        let removed = reg.remove(&addr).unwrap();
        assert_eq!(removed.address(), &addr);
        assert!(removed.is_terminating());
        assert!(reg.is_empty());
        assert!(reg.remove(&addr).is_none());
    }
}
