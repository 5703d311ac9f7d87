//! The composed transport: identity, connections, callbacks, reconnection and
//! replay behind one owner.
//!
//! Application calls ([`Transport::initialize_endpoint`],
//! [`Transport::terminate_endpoint`], [`Transmit::transmit`]) live here. Socket
//! event fan-out lives in [`crate::endpoint`].

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tether_core::{LogicalEndpoint, PhysicalAddress};
use tether_settings::TetherSettings;
use tracing::{debug, info};

use crate::actions::{Action, ActionKind, ActionRegistry, Subscription};
use crate::connection::ConnectionRegistry;
use crate::errors::{Result, TransportError};
use crate::frame::TransmissionFrame;
use crate::identity::IdentityResolver;
use crate::replay::ReplayCache;
use crate::socket::SocketFactory;
use crate::sustainer::Sustainer;

/// What happened to a transmitted message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to an open socket.
    Sent,
    /// Held in the replay cache until the endpoint reconnects.
    Deferred,
    /// Replay cache full. The message is lost.
    Dropped,
}

/// Outbound seam used by the RPC transmitters.
pub trait Transmit {
    /// Send `message` to `endpoint` under `protocol`, deferring it while the
    /// endpoint is disconnected.
    fn transmit(
        &mut self,
        endpoint: &LogicalEndpoint,
        protocol: &str,
        message: &str,
    ) -> Result<Delivery>;
}

/// Owner of every transport registry.
pub struct Transport {
    pub(crate) identity: IdentityResolver,
    pub(crate) connections: ConnectionRegistry,
    pub(crate) actions: ActionRegistry,
    pub(crate) sustainer: Sustainer,
    pub(crate) replay: ReplayCache,
    pub(crate) protocols: HashSet<String>,
    /// Disconnect callbacks handed to `terminate_endpoint`, dropped after the
    /// close they were registered for.
    pub(crate) farewells: HashMap<PhysicalAddress, Vec<Subscription>>,
}

impl Transport {
    /// Create a transport that opens sockets through `factory`.
    pub fn new(factory: Box<dyn SocketFactory>, settings: &TetherSettings) -> Self {
        Self {
            identity: IdentityResolver::new(),
            connections: ConnectionRegistry::new(factory),
            actions: ActionRegistry::new(),
            sustainer: Sustainer::new(&settings.sustainer),
            replay: ReplayCache::new(&settings.replay),
            protocols: HashSet::new(),
            farewells: HashMap::new(),
        }
    }

    /// Accept inbound frames tagged with `protocol`.
    pub fn register_protocol(&mut self, protocol: impl Into<String>) {
        let _ = self.protocols.insert(protocol.into());
    }

    /// Bind `endpoint` to `address`, register callbacks and start connecting.
    ///
    /// Re-initializing an endpoint on the same address keeps its connection
    /// and adds the new callbacks. Moving it to a new address tears the old
    /// connection down first.
    pub fn initialize_endpoint(
        &mut self,
        endpoint: LogicalEndpoint,
        address: PhysicalAddress,
        on_connect: Vec<Action>,
        on_disconnect: Vec<Action>,
    ) -> Result<Vec<Subscription>> {
        let previous = self.identity.bind(endpoint.clone(), address.clone());
        if let Some(old) = previous.filter(|old| *old != address) {
            info!(%endpoint, from = %old, to = %address, "endpoint moved, dropping old connection");
            self.discard_address(&old);
        }

        let _ = self.connections.initialize(&address);
        if self.connections.unmark_terminating(&address) {
            // the pending close now reconnects instead of tearing down
            self.sustainer.enable(&address);
            info!(%endpoint, %address, "termination superseded by re-initialize");
        }

        let mut subscriptions = Vec::with_capacity(on_connect.len() + on_disconnect.len());
        for action in on_connect {
            subscriptions.push(self.actions.register(&address, ActionKind::Connect, action));
        }
        for action in on_disconnect {
            subscriptions.push(self.actions.register(&address, ActionKind::Disconnect, action));
        }

        if !self.connections.is_open(&address) {
            self.connections.establish(&address, Duration::ZERO)?;
        }
        debug!(%endpoint, %address, "endpoint initialized");
        Ok(subscriptions)
    }

    /// Close `endpoint` for good and forget it.
    ///
    /// Reconnection is disabled and the replay backlog dropped. The disconnect
    /// callbacks, including `on_disconnect`, run exactly once: on the close
    /// event if the connection is open, otherwise right away.
    pub fn terminate_endpoint(
        &mut self,
        endpoint: &LogicalEndpoint,
        on_disconnect: Vec<Action>,
    ) -> Result<()> {
        let address = self.address_for(endpoint)?;
        let farewells: Vec<Subscription> = on_disconnect
            .into_iter()
            .map(|action| self.actions.register(&address, ActionKind::Disconnect, action))
            .collect();

        self.sustainer.disable(&address);
        let dropped = self.replay.clear(endpoint);
        if dropped > 0 {
            info!(%endpoint, dropped, "replay backlog discarded on terminate");
        }

        if self.connections.is_open(&address) {
            self.connections.mark_terminating(&address)?;
            self.farewells.entry(address.clone()).or_default().extend(farewells);
            self.connections.close(&address)?;
            debug!(%endpoint, %address, "terminating, awaiting close");
        } else {
            self.connections.close(&address)?;
            let _ = self.actions.run(&address, ActionKind::Disconnect);
            self.teardown(&address);
        }
        Ok(())
    }

    /// Cancel a connect or disconnect callback.
    pub fn cancel_subscription(&mut self, subscription: &Subscription) -> bool {
        self.actions.cancel(subscription)
    }

    /// Stop reconnecting `endpoint`.
    ///
    /// An open connection stays up and is not restored after its next close.
    /// A connect that is pending is abandoned.
    pub fn cancel_reconnection(&mut self, endpoint: &LogicalEndpoint) -> Result<()> {
        let address = self.address_for(endpoint)?;
        self.sustainer.disable(&address);
        if !self.connections.is_open(&address) {
            self.connections.close(&address)?;
        }
        info!(%endpoint, "reconnection cancelled");
        Ok(())
    }

    /// Re-enable reconnection with a fresh attempt budget, connecting now if
    /// the endpoint is down.
    pub fn enable_reconnection(&mut self, endpoint: &LogicalEndpoint) -> Result<()> {
        let address = self.address_for(endpoint)?;
        self.sustainer.enable(&address);
        if !self.connections.is_open(&address) {
            self.connections.establish(&address, Duration::ZERO)?;
        }
        info!(%endpoint, "reconnection enabled");
        Ok(())
    }

    /// Whether `endpoint` has an open connection.
    pub fn is_open(&self, endpoint: &LogicalEndpoint) -> bool {
        self.identity
            .address_of(endpoint)
            .is_some_and(|address| self.connections.is_open(address))
    }

    /// Address currently serving `endpoint`.
    pub fn address_of(&self, endpoint: &LogicalEndpoint) -> Option<&PhysicalAddress> {
        self.identity.address_of(endpoint)
    }

    /// Frames waiting in the replay cache for `endpoint`.
    pub fn pending(&self, endpoint: &LogicalEndpoint) -> usize {
        self.replay.pending(endpoint)
    }

    /// Read access to the identity resolver.
    pub fn identity(&self) -> &IdentityResolver {
        &self.identity
    }

    /// Read access to the connection registry.
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Read access to the reconnection sustainer.
    pub fn sustainer(&self) -> &Sustainer {
        &self.sustainer
    }

    /// Read access to the action registry.
    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    fn address_for(&self, endpoint: &LogicalEndpoint) -> Result<PhysicalAddress> {
        self.identity
            .address_of(endpoint)
            .cloned()
            .ok_or_else(|| TransportError::UnknownEndpoint {
                endpoint: endpoint.clone(),
            })
    }

    /// Forget everything registered for `address` and its endpoint.
    pub(crate) fn teardown(&mut self, address: &PhysicalAddress) {
        if let Some(endpoint) = self.identity.endpoint_of(address).cloned() {
            let _ = self.identity.unbind(&endpoint);
            let _ = self.replay.clear(&endpoint);
            info!(%endpoint, %address, "endpoint terminated");
        }
        self.actions.clear(address);
        self.sustainer.forget(address);
        let _ = self.farewells.remove(address);
        let _ = self.connections.remove(address);
    }

    /// Drop an address that no longer serves any endpoint.
    fn discard_address(&mut self, address: &PhysicalAddress) {
        if self.connections.contains(address) {
            let _ = self.connections.close(address);
        }
        self.actions.clear(address);
        self.sustainer.forget(address);
        let _ = self.farewells.remove(address);
        let _ = self.connections.remove(address);
    }
}

impl Transmit for Transport {
    fn transmit(
        &mut self,
        endpoint: &LogicalEndpoint,
        protocol: &str,
        message: &str,
    ) -> Result<Delivery> {
        let address = self.address_for(endpoint)?;
        let frame = TransmissionFrame::new(protocol, message).encode()?;

        if self.connections.send(&address, &frame)? {
            return Ok(Delivery::Sent);
        }
        if self.replay.enqueue(endpoint, frame) {
            Ok(Delivery::Deferred)
        } else {
            Ok(Delivery::Dropped)
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("endpoints", &self.identity.len())
            .field("connections", &self.connections.len())
            .field("protocols", &self.protocols)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
