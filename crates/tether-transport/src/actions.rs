//! Action registry: connect and disconnect callbacks per address.
//!
//! Every registration returns a [`Subscription`] that can be cancelled, so a
//! caller that re-initializes an endpoint can drop the callbacks it no longer
//! wants instead of piling up duplicates.

use std::collections::HashMap;

use tether_core::PhysicalAddress;
use tracing::trace;

/// A zero-argument lifecycle callback.
pub type Action = Box<dyn FnMut() + Send>;

/// Which lifecycle edge an action runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Runs after the connection opens.
    Connect,
    /// Runs after the connection closes.
    Disconnect,
}

/// Handle for one registered action.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
    address: PhysicalAddress,
    kind: ActionKind,
}

impl Subscription {
    /// Address the action is registered for.
    pub fn address(&self) -> &PhysicalAddress {
        &self.address
    }

    /// Lifecycle edge the action runs on.
    pub fn kind(&self) -> ActionKind {
        self.kind
    }
}

/// Per-address connect and disconnect actions, run in registration order.
#[derive(Default)]
pub struct ActionRegistry {
    next_id: u64,
    actions: HashMap<(PhysicalAddress, ActionKind), Vec<(u64, Action)>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` to run on `kind` events for `address`.
    pub fn register(
        &mut self,
        address: &PhysicalAddress,
        kind: ActionKind,
        action: Action,
    ) -> Subscription {
        self.next_id += 1;
        let id = self.next_id;
        self.actions
            .entry((address.clone(), kind))
            .or_default()
            .push((id, action));
        Subscription {
            id,
            address: address.clone(),
            kind,
        }
    }

    /// Remove a registered action. Returns `false` if it was already gone.
    pub fn cancel(&mut self, subscription: &Subscription) -> bool {
        let key = (subscription.address.clone(), subscription.kind);
        let Some(list) = self.actions.get_mut(&key) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != subscription.id);
        let removed = list.len() < before;
        if list.is_empty() {
            let _ = self.actions.remove(&key);
        }
        removed
    }

    /// Run every `kind` action for `address`. Returns how many ran.
    pub fn run(&mut self, address: &PhysicalAddress, kind: ActionKind) -> usize {
        let Some(list) = self.actions.get_mut(&(address.clone(), kind)) else {
            return 0;
        };
        for (_, action) in list.iter_mut() {
            action();
        }
        trace!(%address, ?kind, count = list.len(), "actions run");
        list.len()
    }

    /// Number of `kind` actions registered for `address`.
    pub fn count(&self, address: &PhysicalAddress, kind: ActionKind) -> usize {
        self.actions
            .get(&(address.clone(), kind))
            .map_or(0, Vec::len)
    }

    /// Drop every action registered for `address`.
    pub fn clear(&mut self, address: &PhysicalAddress) {
        let _ = self.actions.remove(&(address.clone(), ActionKind::Connect));
        let _ = self.actions.remove(&(address.clone(), ActionKind::Disconnect));
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("next_id", &self.next_id)
            .field("keys", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}
