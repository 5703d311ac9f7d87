//! In-memory sockets for deterministic tests.
//!
//! [`MockSocketFactory`] hands out sockets that record every call into a shared
//! log instead of touching the network. Tests drive the lifecycle by feeding
//! [`SocketEvent`](crate::SocketEvent)s to the transport by hand.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tether_core::PhysicalAddress;

use crate::socket::{Socket, SocketError, SocketFactory};

/// One recorded socket call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketCall {
    /// `Socket::open` was called.
    Open {
        /// Target address.
        address: PhysicalAddress,
        /// Requested delay.
        delay: Duration,
    },
    /// `Socket::send` was called and accepted the frame.
    Send {
        /// Target address.
        address: PhysicalAddress,
        /// Frame text.
        text: String,
    },
    /// `Socket::close` was called.
    Close {
        /// Target address.
        address: PhysicalAddress,
    },
}

#[derive(Default)]
struct Shared {
    calls: Vec<SocketCall>,
    created: Vec<PhysicalAddress>,
    fail_sends: bool,
}

/// Factory for recording sockets. Clones share one log.
#[derive(Clone, Default)]
pub struct MockSocketFactory {
    shared: Arc<Mutex<Shared>>,
}

impl MockSocketFactory {
    /// Create a factory with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<SocketCall> {
        self.shared.lock().calls.clone()
    }

    /// Frames accepted by sockets for `address`, in order.
    pub fn sent(&self, address: &PhysicalAddress) -> Vec<String> {
        self.shared
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                SocketCall::Send { address: a, text } if a == address => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Delays of every `open` call for `address`, in order.
    pub fn opens(&self, address: &PhysicalAddress) -> Vec<Duration> {
        self.shared
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                SocketCall::Open { address: a, delay } if a == address => Some(*delay),
                _ => None,
            })
            .collect()
    }

    /// Number of `close` calls for `address`.
    pub fn closes(&self, address: &PhysicalAddress) -> usize {
        self.shared
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, SocketCall::Close { address: a } if a == address))
            .count()
    }

    /// Number of sockets created for `address`.
    pub fn created(&self, address: &PhysicalAddress) -> usize {
        self.shared
            .lock()
            .created
            .iter()
            .filter(|a| *a == address)
            .count()
    }

    /// Make every subsequent `send` fail with [`SocketError::Io`].
    pub fn fail_sends(&self, fail: bool) {
        self.shared.lock().fail_sends = fail;
    }

    /// Forget all recorded calls.
    pub fn clear(&self) {
        self.shared.lock().calls.clear();
    }
}

impl SocketFactory for MockSocketFactory {
    fn create(&self, address: &PhysicalAddress) -> Box<dyn Socket> {
        self.shared.lock().created.push(address.clone());
        Box::new(MockSocket {
            address: address.clone(),
            shared: Arc::clone(&self.shared),
        })
    }
}

struct MockSocket {
    address: PhysicalAddress,
    shared: Arc<Mutex<Shared>>,
}

impl Socket for MockSocket {
    fn open(&mut self, delay: Duration) {
        self.shared.lock().calls.push(SocketCall::Open {
            address: self.address.clone(),
            delay,
        });
    }

    fn send(&mut self, text: &str) -> Result<(), SocketError> {
        let mut shared = self.shared.lock();
        if shared.fail_sends {
            return Err(SocketError::Io("simulated send failure".into()));
        }
        shared.calls.push(SocketCall::Send {
            address: self.address.clone(),
            text: text.to_owned(),
        });
        Ok(())
    }

    fn close(&mut self) {
        self.shared.lock().calls.push(SocketCall::Close {
            address: self.address.clone(),
        });
    }
}
