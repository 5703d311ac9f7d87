//! Identity resolver: the one-to-one binding between logical endpoints and
//! the physical addresses currently serving them.

use std::collections::HashMap;

use tether_core::{LogicalEndpoint, PhysicalAddress};
use tracing::debug;

/// Bidirectional `LogicalEndpoint` ⇄ `PhysicalAddress` map.
///
/// Binding either side again replaces the old pairing, so each endpoint has at
/// most one address and each address serves at most one endpoint.
#[derive(Debug, Default)]
pub struct IdentityResolver {
    by_endpoint: HashMap<LogicalEndpoint, PhysicalAddress>,
    by_address: HashMap<PhysicalAddress, LogicalEndpoint>,
}

impl IdentityResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `endpoint` to `address`, returning the endpoint's previous address.
    pub fn bind(
        &mut self,
        endpoint: LogicalEndpoint,
        address: PhysicalAddress,
    ) -> Option<PhysicalAddress> {
        if let Some(other) = self.by_address.remove(&address) {
            if other != endpoint {
                let _ = self.by_endpoint.remove(&other);
                debug!(endpoint = %other, %address, "address rebound away from endpoint");
            }
        }
        let previous = self.by_endpoint.insert(endpoint.clone(), address.clone());
        if let Some(old) = previous.as_ref().filter(|old| **old != address) {
            let _ = self.by_address.remove(old);
            debug!(%endpoint, from = %old, to = %address, "endpoint rebound");
        }
        let _ = self.by_address.insert(address, endpoint);
        previous
    }

    /// Address currently serving `endpoint`.
    pub fn address_of(&self, endpoint: &LogicalEndpoint) -> Option<&PhysicalAddress> {
        self.by_endpoint.get(endpoint)
    }

    /// Endpoint served by `address`.
    pub fn endpoint_of(&self, address: &PhysicalAddress) -> Option<&LogicalEndpoint> {
        self.by_address.get(address)
    }

    /// Drop the binding for `endpoint`, returning its address.
    pub fn unbind(&mut self, endpoint: &LogicalEndpoint) -> Option<PhysicalAddress> {
        let address = self.by_endpoint.remove(endpoint)?;
        let _ = self.by_address.remove(&address);
        Some(address)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.by_endpoint.len()
    }

    /// Whether there are no bindings.
    pub fn is_empty(&self) -> bool {
        self.by_endpoint.is_empty()
    }
}
