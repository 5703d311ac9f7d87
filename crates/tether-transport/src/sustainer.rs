//! Reconnection sustainer: bounded-retry reconnection per address.
//!
//! Each unexpected close spends one attempt from a fixed budget and schedules
//! a reconnect after a fixed delay. A successful open refills the budget. The
//! attempt that spends the last of the budget also disables the sustainer, so
//! the next close finds it disabled and nothing more is scheduled until the
//! connection opens or [`Sustainer::enable`] is called.

use std::collections::HashMap;
use std::time::Duration;

use metrics::counter;
use tether_core::PhysicalAddress;
use tether_settings::SustainerSettings;
use tracing::{debug, info, warn};

use crate::connection::ConnectionRegistry;
use crate::errors::Result;

/// Retry state for one address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SustainerState {
    /// Reconnect attempts since the last successful open.
    pub attempts: u32,
    /// Whether a close should trigger a reconnect.
    pub enabled: bool,
    /// Delay used for the most recent reconnect.
    pub delay: Duration,
}

impl Default for SustainerState {
    fn default() -> Self {
        Self {
            attempts: 0,
            enabled: true,
            delay: Duration::ZERO,
        }
    }
}

/// What [`Sustainer::on_close`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SustainOutcome {
    /// Disabled by an explicit close. Nothing scheduled.
    Inactive,
    /// Attempt budget spent. Nothing scheduled.
    Exhausted,
    /// A reconnect was scheduled.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
        /// Delay before the connect.
        delay: Duration,
        /// Whether this attempt spent the last of the budget.
        last: bool,
    },
}

/// Per-address bounded-retry state machine.
#[derive(Debug)]
pub struct Sustainer {
    max_attempts: u32,
    delay: Duration,
    states: HashMap<PhysicalAddress, SustainerState>,
}

impl Sustainer {
    /// Create a sustainer with the given retry policy.
    pub fn new(settings: &SustainerSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            delay: settings.reconnect_delay(),
            states: HashMap::new(),
        }
    }

    /// Configured attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Reset `address` after a successful open.
    pub fn on_open(&mut self, address: &PhysicalAddress) {
        let state = self.states.entry(address.clone()).or_default();
        if state.attempts > 0 {
            info!(%address, attempts = state.attempts, "connection restored");
        }
        *state = SustainerState::default();
    }

    /// Handle an unexpected close, scheduling a reconnect if the budget allows.
    pub fn on_close(
        &mut self,
        address: &PhysicalAddress,
        connections: &mut ConnectionRegistry,
    ) -> Result<SustainOutcome> {
        let max_attempts = self.max_attempts;
        let state = self.states.entry(address.clone()).or_default();

        if !state.enabled {
            if state.attempts >= max_attempts {
                warn!(%address, attempts = state.attempts, "reconnection attempts exhausted");
                return Ok(SustainOutcome::Exhausted);
            }
            debug!(%address, "sustainer disabled, not reconnecting");
            return Ok(SustainOutcome::Inactive);
        }

        if state.attempts + 1 > max_attempts {
            state.enabled = false;
            warn!(%address, attempts = state.attempts, "reconnection attempts exhausted");
            return Ok(SustainOutcome::Exhausted);
        }

        state.attempts += 1;
        state.delay = self.delay;
        let attempt = state.attempts;
        let last = attempt == max_attempts;
        if last {
            state.enabled = false;
        }

        connections.establish(address, self.delay)?;
        counter!("tether_reconnect_attempts_total").increment(1);
        info!(
            %address,
            attempt,
            max_attempts,
            delay_ms = self.delay.as_millis(),
            "scheduling reconnect"
        );

        Ok(SustainOutcome::Reconnecting {
            attempt,
            delay: self.delay,
            last,
        })
    }

    /// Stop reconnecting `address` until it opens or is re-enabled.
    pub fn disable(&mut self, address: &PhysicalAddress) {
        self.states.entry(address.clone()).or_default().enabled = false;
    }

    /// Re-enable reconnection for `address` with a fresh attempt budget.
    pub fn enable(&mut self, address: &PhysicalAddress) {
        let _ = self
            .states
            .insert(address.clone(), SustainerState::default());
    }

    /// Whether a close on `address` would trigger a reconnect.
    pub fn is_enabled(&self, address: &PhysicalAddress) -> bool {
        self.states.get(address).is_none_or(|s| s.enabled)
    }

    /// Attempts spent since the last open.
    pub fn attempts(&self, address: &PhysicalAddress) -> u32 {
        self.states.get(address).map_or(0, |s| s.attempts)
    }

    /// Snapshot of the state for `address`.
    pub fn state(&self, address: &PhysicalAddress) -> SustainerState {
        self.states.get(address).copied().unwrap_or_default()
    }

    /// Drop all state for `address`.
    pub fn forget(&mut self, address: &PhysicalAddress) {
        let _ = self.states.remove(address);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::testing::MockSocketFactory;
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    fn setup(max_attempts: u32) -> (Sustainer, ConnectionRegistry, MockSocketFactory, PhysicalAddress) {
        let factory = MockSocketFactory::new();
        let mut connections = ConnectionRegistry::new(Box::new(factory.clone()));
        let address = PhysicalAddress::from("ws://localhost/api");
        let _ = connections.initialize(&address);
        let sustainer = Sustainer::new(&SustainerSettings {
            max_attempts,
            reconnect_delay_ms: 2_000,
        });
        (sustainer, connections, factory, address)
    }

    // ── close handling ──────────────────────────────────────────────

    #[test]
    fn first_close_schedules_reconnect() {
        let (mut s, mut conns, factory, addr) = setup(5);
        let outcome = s.on_close(&addr, &mut conns).unwrap();
        assert_eq!(
            outcome,
            SustainOutcome::Reconnecting {
                attempt: 1,
                delay: Duration::from_secs(2),
                last: false,
            }
        );
        assert_eq!(factory.opens(&addr), vec![Duration::from_secs(2)]);
        assert_eq!(s.state(&addr).delay, Duration::from_secs(2));
    }

    #[test]
    fn five_closes_disable_and_sixth_does_not_reconnect() {
        let (mut s, mut conns, factory, addr) = setup(5);
        for n in 1..=5 {
            let outcome = s.on_close(&addr, &mut conns).unwrap();
            assert_matches!(
                outcome,
                SustainOutcome::Reconnecting { attempt, last, .. } if attempt == n && last == (n == 5)
            );
        }
        assert!(!s.is_enabled(&addr));
        assert_eq!(s.attempts(&addr), 5);

        let sixth = s.on_close(&addr, &mut conns).unwrap();
        assert_eq!(sixth, SustainOutcome::Exhausted);
        assert_eq!(factory.opens(&addr).len(), 5);
    }

    #[test]
    fn open_resets_budget() {
        let (mut s, mut conns, _factory, addr) = setup(2);
        let _ = s.on_close(&addr, &mut conns).unwrap();
        let _ = s.on_close(&addr, &mut conns).unwrap();
        assert!(!s.is_enabled(&addr));

        s.on_open(&addr);
        assert!(s.is_enabled(&addr));
        assert_eq!(s.attempts(&addr), 0);
        assert_matches!(
            s.on_close(&addr, &mut conns).unwrap(),
            SustainOutcome::Reconnecting { attempt: 1, .. }
        );
    }

    #[test]
    fn manual_disable_is_inactive() {
        let (mut s, mut conns, factory, addr) = setup(5);
        s.disable(&addr);
        assert_eq!(s.on_close(&addr, &mut conns).unwrap(), SustainOutcome::Inactive);
        assert!(factory.opens(&addr).is_empty());
    }

    #[test]
    fn enable_refills_budget() {
        let (mut s, mut conns, _factory, addr) = setup(1);
        let _ = s.on_close(&addr, &mut conns).unwrap();
        assert!(!s.is_enabled(&addr));
        s.enable(&addr);
        assert!(s.is_enabled(&addr));
        assert_matches!(
            s.on_close(&addr, &mut conns).unwrap(),
            SustainOutcome::Reconnecting { attempt: 1, last: true, .. }
        );
    }

    #[test]
    fn unknown_address_fails_fast() {
        let (mut s, mut conns, _factory, _addr) = setup(5);
        let stranger = PhysicalAddress::from("ws://nowhere");
        assert_matches!(
            s.on_close(&stranger, &mut conns),
            Err(TransportError::UnknownAddress { .. })
        );
    }

    #[test]
    fn forget_drops_state() {
        let (mut s, mut conns, _factory, addr) = setup(5);
        let _ = s.on_close(&addr, &mut conns).unwrap();
        s.forget(&addr);
        assert_eq!(s.state(&addr), SustainerState::default());
    }

    // ── properties ──────────────────────────────────────────────────

    proptest! {
        #[test]
        fn attempts_never_exceed_limit(
            max in 1u32..8,
            events in prop::collection::vec(any::<bool>(), 0..64),
        ) {
            let (mut s, mut conns, factory, addr) = setup(max);
            let mut closes_since_open = 0u32;
            for is_open in events {
                if is_open {
                    s.on_open(&addr);
                    closes_since_open = 0;
                } else {
                    let _ = s.on_close(&addr, &mut conns).unwrap();
                    closes_since_open += 1;
                }
                prop_assert!(s.attempts(&addr) <= max);
                prop_assert_eq!(s.is_enabled(&addr), closes_since_open < max);
            }
            prop_assert!(factory.opens(&addr).len() <= 64);
        }
    }
}
